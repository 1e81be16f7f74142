use engine::{
    Category, EngineError, Money, PaymentMethod, RecurrenceDraft, TransactionKind,
};

/// An amount typed in chat, with the optional text after it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct QuickEntry {
    pub kind: TransactionKind,
    pub amount: Money,
    pub description: Option<String>,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum ParseError {
    #[error("Monto inválido. Escribe un número positivo, por ejemplo: 85.50")]
    InvalidAmount,
    #[error("Monto demasiado grande: el máximo por registro es $1,000,000,000.00")]
    AmountTooLarge,
    #[error("Mensaje vacío.")]
    Empty,
    #[error("Categoría no reconocida: {0}")]
    InvalidCategory(String),
    #[error("Método de pago no reconocido: {0}")]
    InvalidPaymentMethod(String),
    #[error("Día inválido: usa un número entre 1 y 31.")]
    InvalidDay,
    #[error("Tipo inválido: usa gasto o ingreso.")]
    InvalidKind,
    #[error(
        "Uso: /fijo <gasto|ingreso> <monto> <categoría> <método> <día> [descripción]\nEjemplo: /fijo gasto 1500 vivienda bcp 5 alquiler"
    )]
    FixedUsage,
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `text` should be treated as a quick entry rather than ignored.
pub(crate) fn looks_like_amount(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('+')
        || trimmed.starts_with('-')
        || trimmed.starts_with('$')
        || trimmed.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Parses `<amount> [description]` where the amount must be positive.
pub(crate) fn parse_amount_with_description(
    input: &str,
) -> Result<(Money, Option<String>), ParseError> {
    let trimmed = collapse_whitespace(input);
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parts = trimmed.splitn(2, ' ');
    let amount_str = parts.next().ok_or(ParseError::InvalidAmount)?;
    let amount = parse_entry_amount(amount_str)?;
    let description = parts
        .next()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    Ok((amount, description))
}

/// Parses a quick-entry message.
///
/// - `85 almuerzo` => expense of 85.00 described as "almuerzo"
/// - `+2500 sueldo` => income
pub(crate) fn parse_quick_entry(input: &str) -> Result<QuickEntry, ParseError> {
    let trimmed = input.trim();
    let (kind, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => (TransactionKind::Income, rest),
        None => (TransactionKind::Expense, trimmed),
    };
    let (amount, description) = parse_amount_with_description(rest)?;
    Ok(QuickEntry {
        kind,
        amount,
        description,
    })
}

pub(crate) fn parse_kind(input: &str) -> Result<TransactionKind, ParseError> {
    match input.trim().to_lowercase().as_str() {
        "gasto" | "g" | "expense" => Ok(TransactionKind::Expense),
        "ingreso" | "i" | "income" => Ok(TransactionKind::Income),
        _ => Err(ParseError::InvalidKind),
    }
}

/// Parses the arguments of `/fijo`.
pub(crate) fn parse_fixed(user_id: i64, args: &str) -> Result<RecurrenceDraft, ParseError> {
    let args = collapse_whitespace(args);
    let parts: Vec<&str> = args.splitn(6, ' ').collect();
    if parts.len() < 5 {
        return Err(ParseError::FixedUsage);
    }

    let kind = parse_kind(parts[0])?;
    let amount = parse_entry_amount(parts[1])?;
    let category = Category::parse_for_kind(parts[2], kind).map_err(ParseError::from)?;
    let payment_method = PaymentMethod::parse(parts[3]).map_err(ParseError::from)?;
    let day_of_month: u32 = parts[4].parse().map_err(|_| ParseError::InvalidDay)?;
    if !(1..=31).contains(&day_of_month) {
        return Err(ParseError::InvalidDay);
    }
    let description = parts.get(5).map(|d| d.to_string());

    Ok(RecurrenceDraft {
        user_id,
        kind,
        amount,
        category,
        payment_method,
        description,
        day_of_month,
    })
}

impl From<EngineError> for ParseError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidAmount(_) => ParseError::InvalidAmount,
            EngineError::InvalidCategory(msg) => ParseError::InvalidCategory(msg),
            EngineError::InvalidPaymentMethod(msg) => ParseError::InvalidPaymentMethod(msg),
            EngineError::InvalidDay(_) => ParseError::InvalidDay,
            _ => ParseError::Empty,
        }
    }
}

fn parse_entry_amount(input: &str) -> Result<Money, ParseError> {
    Money::parse_positive(input).map_err(|_| match input.parse::<Money>() {
        Ok(amount) if amount > Money::MAX_ENTRY => ParseError::AmountTooLarge,
        _ => ParseError::InvalidAmount,
    })
}
