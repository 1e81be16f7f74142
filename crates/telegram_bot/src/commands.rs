//! Command structs

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(
    rename_rule = "lowercase",
    description = "Comandos de GastosBot:"
)]
pub enum Command {
    #[command(description = "Bienvenida y resumen rápido.")]
    Start,
    #[command(description = "Muestra la ayuda.")]
    Help,
    #[command(description = "Registrar un gasto paso a paso.")]
    Gasto,
    #[command(description = "Registrar un ingreso paso a paso.")]
    Ingreso,
    #[command(description = "Cancelar el registro en curso.", aliases = ["cancel"])]
    Cancelar,
    #[command(description = "Resumen del mes con gráficas.")]
    Resumen,
    #[command(description = "Gastos de hoy.")]
    Hoy,
    #[command(description = "Últimos 10 movimientos.")]
    Recientes,
    #[command(description = "Eliminar el último registro.")]
    Borrar,
    #[command(description = "Lista de movimientos fijos.")]
    Fijos,
    #[command(
        description = "Crear un fijo: <gasto|ingreso> <monto> <categoría> <método> <día> [descripción]"
    )]
    Fijo(String),
    #[command(description = "Registrar ahora los fijos de hoy.")]
    EjecutarFijos,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spanish_commands() {
        assert_eq!(Command::parse("/resumen", "gastos_bot").unwrap(), Command::Resumen);
        assert_eq!(
            Command::parse("/ejecutarfijos", "gastos_bot").unwrap(),
            Command::EjecutarFijos
        );
        assert_eq!(Command::parse("/cancel", "gastos_bot").unwrap(), Command::Cancelar);
        assert_eq!(
            Command::parse("/fijo gasto 1500 vivienda bcp 5", "gastos_bot").unwrap(),
            Command::Fijo("gasto 1500 vivienda bcp 5".to_string())
        );
        assert!(Command::parse("/desconocido", "gastos_bot").is_err());
    }
}
