use chrono_tz::Tz;
use engine::Transaction;

/// Header row written to an empty worksheet.
pub const HEADERS: [&str; 8] = [
    "Fecha",
    "Tipo",
    "Categoría",
    "Descripción",
    "Monto",
    "Método de Pago",
    "Hora",
    "ID",
];

/// Index of the `ID` column, used to find a row again on deletion.
pub(crate) const ID_COLUMN: usize = 7;

/// One spreadsheet row, already rendered as cell strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetRow {
    pub cells: [String; 8],
}

impl SheetRow {
    /// Render `tx` with date and time local to `tz`.
    pub fn from_transaction(tx: &Transaction, tz: Tz) -> Self {
        let local = tx.occurred_at.with_timezone(&tz);
        Self {
            cells: [
                local.format("%d/%m/%Y").to_string(),
                tx.kind.label().to_string(),
                tx.category.label(),
                tx.description.clone().unwrap_or_default(),
                tx.amount.to_decimal_string(),
                tx.payment_method.name().to_string(),
                local.format("%H:%M").to_string(),
                tx.id.to_string(),
            ],
        }
    }

    pub fn id(&self) -> &str {
        &self.cells[ID_COLUMN]
    }
}
