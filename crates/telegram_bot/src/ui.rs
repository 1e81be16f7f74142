use chrono_tz::Tz;
use engine::{
    Category, FixedRecurrence, Materialized, Money, PaymentMethod, Transaction, TransactionKind,
    summary::{DaySummary, MonthSummary},
};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::conversation::{Draft, State};

pub(crate) const CANCEL: &str = "cancel";
pub(crate) const CATEGORY_PREFIX: &str = "cat:";
pub(crate) const PAYMENT_PREFIX: &str = "pay:";
pub(crate) const DEACTIVATE_PREFIX: &str = "fix:off:";

const BAR_CELLS: usize = 8;
const RULE: &str = "────────────────────";

const MONTHS: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

fn cancel_row() -> Vec<InlineKeyboardButton> {
    vec![InlineKeyboardButton::callback("❌ Cancelar", CANCEL)]
}

pub(crate) fn category_keyboard(kind: TransactionKind) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Category::for_kind(kind)
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|c| {
                    InlineKeyboardButton::callback(
                        c.label(),
                        format!("{CATEGORY_PREFIX}{}", c.code()),
                    )
                })
                .collect()
        })
        .collect();
    rows.push(cancel_row());
    InlineKeyboardMarkup::new(rows)
}

pub(crate) fn payment_keyboard() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = PaymentMethod::ALL
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|m| {
                    InlineKeyboardButton::callback(
                        m.label(),
                        format!("{PAYMENT_PREFIX}{}", m.code()),
                    )
                })
                .collect()
        })
        .collect();
    rows.push(cancel_row());
    InlineKeyboardMarkup::new(rows)
}

fn draft_header(draft: &Draft) -> String {
    let mut text = format!(
        "{} {}: {}",
        draft.kind.emoji(),
        draft.kind.label(),
        draft.amount
    );
    if let Some(description) = &draft.description {
        text.push_str(&format!("\n📝 {description}"));
    }
    if draft.photo.is_some() {
        text.push_str("\n📷 Foto adjunta");
    }
    text
}

pub(crate) fn render_amount_prompt(kind: TransactionKind) -> (String, InlineKeyboardMarkup) {
    (
        format!(
            "{} Registrar {}\n\n💵 Escribe el monto y, si quieres, la descripción en el mismo mensaje (ej: 85 almuerzo):",
            kind.emoji(),
            kind.label().to_lowercase()
        ),
        InlineKeyboardMarkup::new(vec![cancel_row()]),
    )
}

pub(crate) fn render_category_prompt(draft: &Draft) -> (String, InlineKeyboardMarkup) {
    (
        format!("{}\n\nSelecciona la categoría:", draft_header(draft)),
        category_keyboard(draft.kind),
    )
}

pub(crate) fn render_payment_prompt(draft: &Draft) -> (String, InlineKeyboardMarkup) {
    let category = draft
        .category
        .map(|c| format!(" → {}", c.label()))
        .unwrap_or_default();
    (
        format!("{}{category}\n\n💳 Método de pago:", draft_header(draft)),
        payment_keyboard(),
    )
}

/// Menu for the step `state` is waiting on, if any.
pub(crate) fn render_prompt(state: &State) -> Option<(String, InlineKeyboardMarkup)> {
    match state {
        State::AwaitingAmount { kind } => Some(render_amount_prompt(*kind)),
        State::AwaitingCategory(draft) => Some(render_category_prompt(draft)),
        State::AwaitingPaymentMethod(draft) => Some(render_payment_prompt(draft)),
        _ => None,
    }
}

pub(crate) fn render_confirmation(tx: &Transaction, today_expenses: Option<Money>) -> String {
    let mut text = format!(
        "✅ {} registrado\n\n{} {}\n💵 {}\n💳 {}\n",
        tx.kind.label(),
        tx.kind.emoji(),
        tx.category.label(),
        tx.amount,
        tx.payment_method.label()
    );
    if let Some(description) = &tx.description {
        text.push_str(&format!("📝 {description}\n"));
    }
    if let Some(total) = today_expenses {
        text.push_str(&format!("\n📊 Total de gastos hoy: {total}"));
    }
    text
}

pub(crate) fn bar(value: Money, max: Money) -> String {
    let filled = if max.is_positive() {
        ((value.as_major_f64() / max.as_major_f64()) * BAR_CELLS as f64) as usize
    } else {
        0
    }
    .min(BAR_CELLS);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_CELLS - filled))
}

pub(crate) fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|idx| MONTHS.get(idx as usize))
        .copied()
        .unwrap_or("")
}

pub(crate) fn render_month_summary(summary: &MonthSummary, year: i32, month: u32) -> String {
    let mut text = format!(
        "📊 Resumen de {} {year}\n{RULE}\n\n💰 Ingresos: {}\n💸 Gastos: {}\n{RULE}\n📊 Balance: {}\n📈 Ahorro: {:.1}%\n",
        month_name(month),
        summary.income,
        summary.expenses,
        summary.balance(),
        summary.savings_pct()
    );

    if !summary.by_category.is_empty() {
        let max = summary
            .by_category
            .first()
            .map(|c| c.total)
            .unwrap_or_default();
        text.push_str("\nGastos por categoría:\n");
        for row in &summary.by_category {
            let pct = if summary.expenses.is_positive() {
                row.total.as_major_f64() / summary.expenses.as_major_f64() * 100.0
            } else {
                0.0
            };
            text.push_str(&format!(
                "{} {}\n   {} ({pct:.0}%)\n",
                bar(row.total, max),
                row.category.label(),
                row.total
            ));
        }
    }
    text
}

pub(crate) fn render_today(day: &DaySummary) -> String {
    let mut text = format!("📅 Gastos de hoy\n{RULE}\n\n");
    let expenses: Vec<&Transaction> = day
        .transactions
        .iter()
        .filter(|tx| tx.kind == TransactionKind::Expense)
        .collect();

    if expenses.is_empty() {
        text.push_str("🎉 ¡No has gastado nada hoy!");
        return text;
    }

    for tx in expenses.iter().rev() {
        let description = tx
            .description
            .as_deref()
            .map(|d| format!(" - {d}"))
            .unwrap_or_default();
        text.push_str(&format!(
            "• {} → {}{description}\n",
            tx.category.label(),
            tx.amount
        ));
    }
    text.push_str(&format!("\n{RULE}\n💸 Total: {}", day.expenses));
    text
}

pub(crate) fn render_recent(rows: &[Transaction], tz: Tz) -> String {
    let mut text = format!("🕐 Últimos movimientos\n{RULE}\n\n");
    if rows.is_empty() {
        text.push_str("No hay movimientos registrados.");
        return text;
    }

    for tx in rows {
        let at = tx.occurred_at.with_timezone(&tz).format("%d/%m %H:%M");
        let description = tx
            .description
            .as_deref()
            .map(|d| format!(" - {d}"))
            .unwrap_or_default();
        let photo = if tx.photo.is_some() { " 📷" } else { "" };
        text.push_str(&format!(
            "{} {at} {}\n   {} ({}){description}{photo}\n\n",
            tx.kind.emoji(),
            tx.category.label(),
            tx.amount,
            tx.payment_method.name()
        ));
    }
    text
}

pub(crate) fn render_deleted(tx: &Transaction) -> String {
    format!("🗑️ Eliminado: {} → {}", tx.category.label(), tx.amount)
}

fn recurrence_line(recurrence: &FixedRecurrence) -> String {
    let description = recurrence
        .description
        .as_deref()
        .map(|d| format!(" - {d}"))
        .unwrap_or_default();
    format!(
        "{} día {}: {} {} ({}){description}",
        recurrence.kind.emoji(),
        recurrence.day_of_month,
        recurrence.category.label(),
        recurrence.amount,
        recurrence.payment_method.name()
    )
}

pub(crate) fn render_recurrences(list: &[FixedRecurrence]) -> (String, InlineKeyboardMarkup) {
    let mut text = format!("📌 Movimientos fijos\n{RULE}\n\n");
    if list.is_empty() {
        text.push_str(
            "No tienes movimientos fijos.\n\nCrea uno con:\n/fijo gasto 1500 vivienda bcp 5 alquiler",
        );
        return (text, InlineKeyboardMarkup::new(Vec::<Vec<InlineKeyboardButton>>::new()));
    }

    let mut rows = Vec::new();
    for (idx, recurrence) in list.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", idx + 1, recurrence_line(recurrence)));
        rows.push(vec![InlineKeyboardButton::callback(
            format!("⏹️ Desactivar {}", idx + 1),
            format!("{DEACTIVATE_PREFIX}{}", recurrence.id),
        )]);
    }
    (text, InlineKeyboardMarkup::new(rows))
}

pub(crate) fn render_recurrence_created(recurrence: &FixedRecurrence) -> String {
    format!(
        "📌 Movimiento fijo creado\n\n{}\n\nSe registrará automáticamente cada mes.",
        recurrence_line(recurrence)
    )
}

pub(crate) fn render_recurrence_deactivated(recurrence: &FixedRecurrence) -> String {
    format!("⏹️ Desactivado: {}", recurrence_line(recurrence))
}

pub(crate) fn render_materialized(item: &Materialized) -> String {
    let tx = &item.transaction;
    let description = tx
        .description
        .as_deref()
        .map(|d| format!("\n📝 {d}"))
        .unwrap_or_default();
    format!(
        "📌 {} fijo registrado\n\n{} {}\n💵 {}\n💳 {}{description}",
        tx.kind.label(),
        tx.kind.emoji(),
        tx.category.label(),
        tx.amount,
        tx.payment_method.label()
    )
}

pub(crate) fn welcome_text(first_name: &str, month: &MonthSummary, today: Money) -> String {
    format!(
        "👋 ¡Hola {first_name}!\n\n💰 GastosBot - Tu control financiero personal\n\n📊 Resumen del mes:\n   Ingresos: {}\n   Gastos: {}\n   Balance: {}\n   Hoy: {today} gastados\n\n⚡ Registro rápido:\n   Escribe el monto directamente: 150\n   O con descripción: 150 uber\n   Ingresos con +: +2500 sueldo\n\n{}",
        month.income,
        month.expenses,
        month.balance(),
        commands_text()
    )
}

fn commands_text() -> &'static str {
    "📋 Comandos:\n/gasto - Registrar un gasto\n/ingreso - Registrar un ingreso\n/resumen - Resumen del mes\n/hoy - Gastos de hoy\n/recientes - Últimos 10 movimientos\n/borrar - Eliminar último registro\n/fijos - Movimientos fijos\n/cancelar - Cancelar el registro en curso\n/help - Ayuda"
}

pub(crate) fn help_text() -> String {
    format!(
        "📖 Guía de GastosBot\n\n⚡ Registro rápido:\nEscribe solo el monto y te pido la categoría:\n  150 → categoría → método de pago → listo\n  85 almuerzo → con descripción\n  +2500 sueldo → ingreso\nLa descripción va después del monto, en el mismo mensaje: no se pide en otro paso.\nTambién puedes enviar una foto con el monto en el texto.\n\n📌 Movimientos fijos:\n/fijo gasto 1500 vivienda bcp 5 alquiler\nSe registran solos el día indicado de cada mes.\n/ejecutarfijos - Registrar ahora los fijos de hoy\n\n{}",
        commands_text()
    )
}

pub(crate) const NOT_AUTHORIZED: &str = "⛔ No estás autorizado para usar este bot.";
pub(crate) const CANCELLED: &str = "❌ Cancelado";
pub(crate) const STORAGE_ERROR: &str = "⚠️ No se pudo guardar. Inténtalo de nuevo más tarde.";
pub(crate) const NOTHING_TO_DELETE: &str = "No hay registros para eliminar.";
pub(crate) const SESSION_EXPIRED: &str = "⌛ No hay un registro en curso. Escribe un monto para empezar.";
