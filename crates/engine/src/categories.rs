//! Fixed category catalogue.
//!
//! Expense and income categories are disjoint: every variant belongs to
//! exactly one [`TransactionKind`], including the two "Otros" buckets.

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine, TransactionKind, util::fold_key};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Vivienda,
    Comida,
    Transporte,
    Servicios,
    Salud,
    Educacion,
    Entretenimiento,
    Ropa,
    Ahorro,
    OtrosGasto,
    Salario,
    Freelance,
    Inversiones,
    Rentas,
    OtrosIngreso,
}

impl Category {
    pub const EXPENSE: [Category; 10] = [
        Category::Vivienda,
        Category::Comida,
        Category::Transporte,
        Category::Servicios,
        Category::Salud,
        Category::Educacion,
        Category::Entretenimiento,
        Category::Ropa,
        Category::Ahorro,
        Category::OtrosGasto,
    ];

    pub const INCOME: [Category; 5] = [
        Category::Salario,
        Category::Freelance,
        Category::Inversiones,
        Category::Rentas,
        Category::OtrosIngreso,
    ];

    /// Menu of categories offered for `kind`, in display order.
    pub fn for_kind(kind: TransactionKind) -> &'static [Category] {
        match kind {
            TransactionKind::Expense => &Self::EXPENSE,
            TransactionKind::Income => &Self::INCOME,
        }
    }

    pub fn kind(self) -> TransactionKind {
        match self {
            Self::Salario | Self::Freelance | Self::Inversiones | Self::Rentas | Self::OtrosIngreso => {
                TransactionKind::Income
            }
            _ => TransactionKind::Expense,
        }
    }

    /// Storage code, also used in callback data.
    pub fn code(self) -> &'static str {
        match self {
            Self::Vivienda => "vivienda",
            Self::Comida => "comida",
            Self::Transporte => "transporte",
            Self::Servicios => "servicios",
            Self::Salud => "salud",
            Self::Educacion => "educacion",
            Self::Entretenimiento => "entretenimiento",
            Self::Ropa => "ropa",
            Self::Ahorro => "ahorro",
            Self::OtrosGasto => "otros_gasto",
            Self::Salario => "salario",
            Self::Freelance => "freelance",
            Self::Inversiones => "inversiones",
            Self::Rentas => "rentas",
            Self::OtrosIngreso => "otros_ingreso",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Vivienda => "Vivienda",
            Self::Comida => "Comida",
            Self::Transporte => "Transporte",
            Self::Servicios => "Servicios",
            Self::Salud => "Salud",
            Self::Educacion => "Educación",
            Self::Entretenimiento => "Entretenimiento",
            Self::Ropa => "Ropa",
            Self::Ahorro => "Ahorro",
            Self::OtrosGasto | Self::OtrosIngreso => "Otros",
            Self::Salario => "Salario",
            Self::Freelance => "Freelance",
            Self::Inversiones => "Inversiones",
            Self::Rentas => "Rentas",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Vivienda | Self::Rentas => "🏠",
            Self::Comida => "🍽️",
            Self::Transporte => "🚗",
            Self::Servicios => "💡",
            Self::Salud => "🏥",
            Self::Educacion => "📚",
            Self::Entretenimiento => "🎮",
            Self::Ropa => "👔",
            Self::Ahorro => "💰",
            Self::OtrosGasto | Self::OtrosIngreso => "🎁",
            Self::Salario => "💼",
            Self::Freelance => "💻",
            Self::Inversiones => "📈",
        }
    }

    /// Display label, e.g. `🍽️ Comida`.
    pub fn label(self) -> String {
        format!("{} {}", self.emoji(), self.name())
    }

    /// Resolve user input (code, name or label) into a category of `kind`.
    ///
    /// A category of the other kind is rejected rather than silently
    /// switching the transaction kind.
    pub fn parse_for_kind(input: &str, kind: TransactionKind) -> ResultEngine<Category> {
        let key = fold_key(input);
        if key.is_empty() {
            return Err(EngineError::InvalidCategory("empty category".to_string()));
        }

        let matches = |c: &Category| fold_key(c.code()) == key || fold_key(c.name()) == key;

        if let Some(found) = Self::for_kind(kind).iter().copied().find(matches) {
            return Ok(found);
        }

        let other = match kind {
            TransactionKind::Expense => TransactionKind::Income,
            TransactionKind::Income => TransactionKind::Expense,
        };
        if Self::for_kind(other).iter().any(matches) {
            return Err(EngineError::InvalidCategory(format!(
                "'{}' is not a {} category",
                input.trim(),
                kind.as_str()
            )));
        }

        Err(EngineError::InvalidCategory(format!(
            "unknown category '{}'",
            input.trim()
        )))
    }
}

impl TryFrom<&str> for Category {
    type Error = EngineError;

    /// Parse a storage code.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::EXPENSE
            .iter()
            .chain(Self::INCOME.iter())
            .copied()
            .find(|c| c.code() == value)
            .ok_or_else(|| EngineError::InvalidCategory(format!("unknown category code: {value}")))
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.label())
    }
}
