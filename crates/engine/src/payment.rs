use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine, util::fold_key};

/// How a transaction was paid or received.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Efectivo,
    Yape,
    Bcp,
    Tarjeta,
    Plin,
    Transferencia,
    NoEspecificado,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 7] = [
        PaymentMethod::Efectivo,
        PaymentMethod::Yape,
        PaymentMethod::Bcp,
        PaymentMethod::Tarjeta,
        PaymentMethod::Plin,
        PaymentMethod::Transferencia,
        PaymentMethod::NoEspecificado,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::Efectivo => "efectivo",
            Self::Yape => "yape",
            Self::Bcp => "bcp",
            Self::Tarjeta => "tarjeta",
            Self::Plin => "plin",
            Self::Transferencia => "transferencia",
            Self::NoEspecificado => "no_especificado",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Efectivo => "Efectivo",
            Self::Yape => "Yape",
            Self::Bcp => "BCP",
            Self::Tarjeta => "Tarjeta",
            Self::Plin => "Plin",
            Self::Transferencia => "Transferencia",
            Self::NoEspecificado => "No especificado",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Efectivo => "💵",
            Self::Yape | Self::Tarjeta => "💳",
            Self::Bcp => "🏦",
            Self::Plin => "📲",
            Self::Transferencia => "🔄",
            Self::NoEspecificado => "⏭️",
        }
    }

    pub fn label(self) -> String {
        format!("{} {}", self.emoji(), self.name())
    }

    /// Resolve user input (code, name or label). `transfer` and `saltar` are
    /// accepted as the short forms the menu buttons used to carry.
    pub fn parse(input: &str) -> ResultEngine<PaymentMethod> {
        let key = fold_key(input);
        match key.as_str() {
            "transfer" => return Ok(Self::Transferencia),
            "saltar" | "sin_especificar" => return Ok(Self::NoEspecificado),
            _ => {}
        }
        Self::ALL
            .iter()
            .copied()
            .find(|m| fold_key(m.code()) == key || fold_key(m.name()) == key)
            .ok_or_else(|| {
                EngineError::InvalidPaymentMethod(format!("unknown payment method '{}'", input.trim()))
            })
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.code() == value)
            .ok_or_else(|| {
                EngineError::InvalidPaymentMethod(format!("unknown payment code: {value}"))
            })
    }
}

impl core::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
