//! Federal income tax liability.
//!
//! Liability is computed from a progressive marginal-bracket schedule: each bracket
//! contributes a fixed base amount plus its marginal rate times the excess over the
//! bracket floor. The bases are precomputed so the schedule is continuous at every
//! floor. All results are rounded to the cent.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Single-filer standard deduction used by the acceptance-time refund estimate.
pub const STANDARD_DEDUCTION: Decimal = dec!(14600);

/// Flat rate applied by the acceptance-time refund estimate.
pub const ESTIMATE_FLAT_RATE: Decimal = dec!(0.10);

/// Tax year whose schedule `compute_liability` uses.
pub const DEFAULT_TAX_YEAR: i32 = 2024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bracket {
    pub floor: Decimal,
    pub base: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketSchedule {
    pub tax_year: i32,
    /// Single-filer standard deduction for the year
    pub standard_deduction: Decimal,
    brackets: [Bracket; 7],
}

const fn bracket(floor: Decimal, base: Decimal, rate: Decimal) -> Bracket {
    Bracket { floor, base, rate }
}

static SCHEDULE_2023: BracketSchedule = BracketSchedule {
    tax_year: 2023,
    standard_deduction: dec!(13850),
    brackets: [
        bracket(dec!(0), dec!(0), dec!(0.10)),
        bracket(dec!(11000), dec!(1100), dec!(0.12)),
        bracket(dec!(44725), dec!(5147), dec!(0.22)),
        bracket(dec!(95375), dec!(16290), dec!(0.24)),
        bracket(dec!(182100), dec!(37104), dec!(0.32)),
        bracket(dec!(231250), dec!(52832), dec!(0.35)),
        bracket(dec!(578125), dec!(174238.25), dec!(0.37)),
    ],
};

static SCHEDULE_2024: BracketSchedule = BracketSchedule {
    tax_year: 2024,
    standard_deduction: STANDARD_DEDUCTION,
    brackets: [
        bracket(dec!(0), dec!(0), dec!(0.10)),
        bracket(dec!(11600), dec!(1160), dec!(0.12)),
        bracket(dec!(47150), dec!(5426), dec!(0.22)),
        bracket(dec!(100525), dec!(17168.50), dec!(0.24)),
        bracket(dec!(191950), dec!(39110.50), dec!(0.32)),
        bracket(dec!(243725), dec!(55678.50), dec!(0.35)),
        bracket(dec!(609350), dec!(183647.25), dec!(0.37)),
    ],
};

impl BracketSchedule {
    /// Schedule for a supported tax year, `None` otherwise.
    pub fn for_year(tax_year: i32) -> Option<&'static BracketSchedule> {
        match tax_year {
            2023 => Some(&SCHEDULE_2023),
            2024 => Some(&SCHEDULE_2024),
            _ => None,
        }
    }

    pub fn supported_years() -> &'static [i32] {
        &[2023, 2024]
    }

    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }

    /// Liability for `taxable_income`; zero or negative income yields zero.
    pub fn liability(&self, taxable_income: Decimal) -> Decimal {
        if taxable_income <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let bracket = self
            .brackets
            .iter()
            .rev()
            .find(|b| taxable_income >= b.floor)
            .unwrap_or(&self.brackets[0]);

        round_cents(bracket.base + bracket.rate * (taxable_income - bracket.floor))
    }
}

/// Liability under the default (2024) schedule.
pub fn compute_liability(taxable_income: Decimal) -> Decimal {
    SCHEDULE_2024.liability(taxable_income)
}

/// Coarse refund estimate used when a filing is first accepted:
/// `withheld - 10% * max(0, wages - standard deduction)`.
///
/// Deliberately separate from the bracket calculator; the two figures are stored
/// in different columns (`refund_amount` vs `refund_or_owed`).
pub fn estimate_refund(total_withheld: Decimal, wages: Decimal) -> Decimal {
    let over_deduction = (wages - STANDARD_DEDUCTION).max(Decimal::ZERO);
    round_cents(total_withheld - ESTIMATE_FLAT_RATE * over_deduction)
}

/// Round to two decimal places, midpoint away from zero.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
