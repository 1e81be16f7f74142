//! Guided entry flow as a pure state machine.
//!
//! ```text
//! Idle ──Amount──▶ AwaitingCategory ──Category──▶ AwaitingPaymentMethod ──Payment──▶ Confirmed
//!  │
//!  └─/gasto, /ingreso─▶ AwaitingAmount ──Amount──▶ AwaitingCategory
//!
//! any state ──Cancel──▶ Cancelled
//! ```
//!
//! [`transition`] never performs I/O: the handler layer turns the returned
//! [`Effect`] into database writes and chat messages.

use engine::{Category, Money, PaymentMethod, TransactionKind};
use teloxide::types::FileId;

/// Fields collected so far. `category` is always set once the draft leaves
/// `AwaitingCategory`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Draft {
    pub kind: TransactionKind,
    pub amount: Money,
    pub description: Option<String>,
    /// Photo that started the entry.
    pub photo: Option<FileId>,
    pub category: Option<Category>,
}

/// A draft with every field supplied, ready to be written to the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CompletedEntry {
    pub kind: TransactionKind,
    pub amount: Money,
    pub category: Category,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub photo: Option<FileId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum State {
    #[default]
    Idle,
    AwaitingAmount {
        kind: TransactionKind,
    },
    AwaitingCategory(Draft),
    AwaitingPaymentMethod(Draft),
    Confirmed(CompletedEntry),
    Cancelled,
}

impl State {
    /// Terminal and idle states are not kept in the session store.
    pub(crate) fn is_active(&self) -> bool {
        matches!(
            self,
            State::AwaitingAmount { .. } | State::AwaitingCategory(_) | State::AwaitingPaymentMethod(_)
        )
    }
}

/// An amount entered by the user. `kind` is only a hint: inside
/// `AwaitingAmount` the session kind wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AmountInput {
    pub kind: TransactionKind,
    pub amount: Money,
    pub description: Option<String>,
    pub photo: Option<FileId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Input {
    Amount(AmountInput),
    Category(Category),
    Payment(PaymentMethod),
    Cancel,
    Unrecognized,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Effect {
    PromptCategory,
    PromptPayment,
    Commit(CompletedEntry),
    Cancelled,
    /// The input does not fit the current step: show the same menu again.
    Reprompt,
    /// Nothing to do, e.g. a stray button press with no session.
    Ignore,
}

fn start(input: AmountInput) -> (State, Effect) {
    (
        State::AwaitingCategory(Draft {
            kind: input.kind,
            amount: input.amount,
            description: input.description,
            photo: input.photo,
            category: None,
        }),
        Effect::PromptCategory,
    )
}

/// The transition table.
pub(crate) fn transition(state: State, input: Input) -> (State, Effect) {
    match (state, input) {
        (_, Input::Cancel) => (State::Cancelled, Effect::Cancelled),

        // A new amount always starts over, discarding any draft in progress.
        (State::AwaitingAmount { kind }, Input::Amount(input)) => {
            start(AmountInput { kind, ..input })
        }
        (_, Input::Amount(input)) => start(input),

        (State::AwaitingCategory(mut draft), Input::Category(category))
            if category.kind() == draft.kind =>
        {
            draft.category = Some(category);
            (State::AwaitingPaymentMethod(draft), Effect::PromptPayment)
        }

        (State::AwaitingPaymentMethod(draft), Input::Payment(payment_method)) => {
            match draft.category {
                Some(category) => {
                    let entry = CompletedEntry {
                        kind: draft.kind,
                        amount: draft.amount,
                        category,
                        payment_method,
                        description: draft.description,
                        photo: draft.photo,
                    };
                    (State::Confirmed(entry.clone()), Effect::Commit(entry))
                }
                None => (State::AwaitingCategory(draft), Effect::PromptCategory),
            }
        }

        (state @ State::AwaitingAmount { .. }, _)
        | (state @ State::AwaitingCategory(_), _)
        | (state @ State::AwaitingPaymentMethod(_), _) => (state, Effect::Reprompt),

        (_, _) => (State::Idle, Effect::Ignore),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(minor: i64, description: Option<&str>) -> Input {
        Input::Amount(AmountInput {
            kind: TransactionKind::Expense,
            amount: Money::new(minor),
            description: description.map(str::to_string),
            photo: None,
        })
    }

    #[test]
    fn quick_entry_walks_every_step() {
        let (state, effect) = transition(State::Idle, amount(8500, Some("almuerzo")));
        assert_eq!(effect, Effect::PromptCategory);

        let (state, effect) = transition(state, Input::Category(Category::Comida));
        assert_eq!(effect, Effect::PromptPayment);

        let (state, effect) = transition(state, Input::Payment(PaymentMethod::Yape));
        let expected = CompletedEntry {
            kind: TransactionKind::Expense,
            amount: Money::new(8500),
            category: Category::Comida,
            payment_method: PaymentMethod::Yape,
            description: Some("almuerzo".to_string()),
            photo: None,
        };
        assert_eq!(effect, Effect::Commit(expected.clone()));
        assert_eq!(state, State::Confirmed(expected));
    }

    #[test]
    fn photo_follows_the_draft_into_the_entry() {
        let photo = FileId("AgACAgEAAxkBAAIC".to_string());
        let input = Input::Amount(AmountInput {
            kind: TransactionKind::Expense,
            amount: Money::new(4200),
            description: Some("menu".to_string()),
            photo: Some(photo.clone()),
        });
        let (state, _) = transition(State::Idle, input);
        let (state, _) = transition(state, Input::Category(Category::Comida));
        let State::AwaitingPaymentMethod(draft) = &state else {
            panic!("unexpected state {state:?}");
        };
        assert_eq!(draft.photo.as_ref(), Some(&photo));

        let (_, effect) = transition(state, Input::Payment(PaymentMethod::Plin));
        let Effect::Commit(entry) = effect else {
            panic!("unexpected effect {effect:?}");
        };
        assert_eq!(entry.photo, Some(photo));
    }

    #[test]
    fn payment_before_category_is_rejected() {
        let (state, _) = transition(State::Idle, amount(1000, None));
        let (state, effect) = transition(state, Input::Payment(PaymentMethod::Efectivo));
        assert_eq!(effect, Effect::Reprompt);
        assert!(matches!(state, State::AwaitingCategory(_)));
    }

    #[test]
    fn never_confirms_without_category_and_payment() {
        let inputs = [
            Input::Unrecognized,
            Input::Payment(PaymentMethod::Plin),
            Input::Category(Category::Salario),
            Input::Unrecognized,
        ];
        let (mut state, _) = transition(State::Idle, amount(1000, None));
        for input in inputs {
            let (next, effect) = transition(state, input);
            assert!(!matches!(effect, Effect::Commit(_)));
            assert!(!matches!(next, State::Confirmed(_)));
            state = next;
        }
    }

    #[test]
    fn category_of_other_kind_reprompts() {
        let (state, _) = transition(State::Idle, amount(1000, None));
        let before = state.clone();
        let (state, effect) = transition(state, Input::Category(Category::Salario));
        assert_eq!(effect, Effect::Reprompt);
        assert_eq!(state, before);
    }

    #[test]
    fn unrecognized_input_keeps_state() {
        let (state, _) = transition(State::Idle, amount(1000, None));
        let (state, _) = transition(state, Input::Category(Category::Ropa));
        let before = state.clone();
        let (state, effect) = transition(state, Input::Unrecognized);
        assert_eq!(effect, Effect::Reprompt);
        assert_eq!(state, before);
    }

    #[test]
    fn new_amount_discards_previous_draft() {
        let (state, _) = transition(State::Idle, amount(1000, Some("cafe")));
        let (state, _) = transition(state, Input::Category(Category::Comida));
        let (state, effect) = transition(state, amount(2000, Some("taxi")));
        assert_eq!(effect, Effect::PromptCategory);
        match state {
            State::AwaitingCategory(draft) => {
                assert_eq!(draft.amount, Money::new(2000));
                assert_eq!(draft.description.as_deref(), Some("taxi"));
                assert_eq!(draft.category, None);
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn awaiting_amount_uses_session_kind() {
        let state = State::AwaitingAmount {
            kind: TransactionKind::Income,
        };
        let (state, effect) = transition(state, amount(500_000, Some("sueldo")));
        assert_eq!(effect, Effect::PromptCategory);
        let State::AwaitingCategory(draft) = &state else {
            panic!("unexpected state {state:?}");
        };
        assert_eq!(draft.kind, TransactionKind::Income);

        let (_, effect) = transition(state, Input::Category(Category::Salario));
        assert_eq!(effect, Effect::PromptPayment);
    }

    #[test]
    fn awaiting_amount_reprompts_on_other_input() {
        let state = State::AwaitingAmount {
            kind: TransactionKind::Expense,
        };
        let (state, effect) = transition(state, Input::Category(Category::Comida));
        assert_eq!(effect, Effect::Reprompt);
        assert!(state.is_active());
    }

    #[test]
    fn cancel_from_any_step() {
        let (state, _) = transition(State::Idle, amount(1000, None));
        let (state, effect) = transition(state, Input::Cancel);
        assert_eq!(effect, Effect::Cancelled);
        assert_eq!(state, State::Cancelled);
        assert!(!state.is_active());
    }

    #[test]
    fn stray_buttons_without_session_are_ignored() {
        let (state, effect) = transition(State::Idle, Input::Payment(PaymentMethod::Yape));
        assert_eq!(effect, Effect::Ignore);
        assert_eq!(state, State::Idle);
    }
}
