//! Operator tooling for the filing service: one-off status sweeps and liability
//! quotes against the bracket schedules.

use rust_decimal::Decimal;
use serde::Serialize;
use taxsync_core::liability::round_cents;
use taxsync_core::{AppError, BracketSchedule};

/// Liability for one income figure under a year's schedule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiabilityQuote {
    pub tax_year: i32,
    pub gross_income: Decimal,
    pub deductions: Decimal,
    pub taxable_income: Decimal,
    pub tax_liability: Decimal,
    pub marginal_rate: Decimal,
    /// Liability as a share of gross income, 4 decimal places
    pub effective_rate: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withheld: Option<Decimal>,
    /// Positive = refund, negative = amount owed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_or_owed: Option<Decimal>,
}

/// Quote the liability on `gross_income`. Deductions default to the standard
/// deduction of `tax_year`.
pub fn quote_liability(
    tax_year: i32,
    gross_income: Decimal,
    deductions: Option<Decimal>,
    withheld: Option<Decimal>,
) -> Result<LiabilityQuote, AppError> {
    let schedule =
        BracketSchedule::for_year(tax_year).ok_or(AppError::UnsupportedTaxYear(tax_year))?;

    if gross_income < Decimal::ZERO {
        return Err(AppError::InvalidInput(
            "income must not be negative".to_string(),
        ));
    }

    let deductions = deductions.unwrap_or(schedule.standard_deduction);
    let taxable_income = round_cents((gross_income - deductions).max(Decimal::ZERO));
    let tax_liability = schedule.liability(taxable_income);

    let marginal_rate = if taxable_income > Decimal::ZERO {
        schedule
            .brackets()
            .iter()
            .rev()
            .find(|b| taxable_income >= b.floor)
            .map(|b| b.rate)
            .unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    let effective_rate = if gross_income > Decimal::ZERO {
        (tax_liability / gross_income).round_dp(4)
    } else {
        Decimal::ZERO
    };

    Ok(LiabilityQuote {
        tax_year,
        gross_income,
        deductions,
        taxable_income,
        tax_liability,
        marginal_rate,
        effective_rate,
        withheld,
        refund_or_owed: withheld.map(|w| w - tax_liability),
    })
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays parseable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn quote_uses_standard_deduction_by_default() {
        let quote = quote_liability(2024, dec!(75000), None, Some(dec!(9000))).unwrap();
        assert_eq!(quote.deductions, dec!(14600));
        assert_eq!(quote.taxable_income, dec!(60400));
        assert_eq!(quote.tax_liability, dec!(8341.00));
        assert_eq!(quote.marginal_rate, dec!(0.22));
        assert_eq!(quote.refund_or_owed, Some(dec!(659.00)));
    }

    #[test]
    fn default_deduction_is_keyed_by_year() {
        let quote = quote_liability(2023, dec!(75000), None, None).unwrap();
        assert_eq!(quote.deductions, dec!(13850));
        assert_eq!(quote.taxable_income, dec!(61150));
        // 5147 + 22% of (61150 - 44725)
        assert_eq!(quote.tax_liability, dec!(8760.50));
    }

    #[test]
    fn income_below_deduction_owes_nothing() {
        let quote = quote_liability(2024, dec!(10000), None, None).unwrap();
        assert_eq!(quote.taxable_income, Decimal::ZERO);
        assert_eq!(quote.tax_liability, Decimal::ZERO);
        assert_eq!(quote.marginal_rate, Decimal::ZERO);
        assert_eq!(quote.effective_rate, Decimal::ZERO);
        assert!(quote.refund_or_owed.is_none());
    }

    #[test]
    fn explicit_deductions_and_other_years() {
        let quote = quote_liability(2023, dec!(50000), Some(dec!(0)), None).unwrap();
        assert_eq!(quote.taxable_income, dec!(50000));
        // 5147 + 22% of (50000 - 44725)
        assert_eq!(quote.tax_liability, dec!(6307.50));
    }

    #[test]
    fn rejects_unsupported_year_and_negative_income() {
        assert!(matches!(
            quote_liability(2019, dec!(1000), None, None),
            Err(AppError::UnsupportedTaxYear(2019))
        ));
        assert!(matches!(
            quote_liability(2024, dec!(-1), None, None),
            Err(AppError::InvalidInput(_))
        ));
    }
}
