use crate::Money;

/// Balance card figures for a list of transactions.
///
/// `expenses` is reported as a positive magnitude; `balance` is
/// `income - expenses`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub income: Money,
    pub expenses: Money,
    pub balance: Money,
}

impl Summary {
    pub fn from_amounts<I>(amounts: I) -> Self
    where
        I: IntoIterator<Item = Money>,
    {
        let (income, expenses) = amounts.into_iter().fold(
            (Money::ZERO, Money::ZERO),
            |(income, expenses), amount| {
                if amount.is_negative() {
                    (income, expenses + amount.abs())
                } else {
                    (income + amount, expenses)
                }
            },
        );

        Self {
            income,
            expenses,
            balance: income - expenses,
        }
    }
}
