use serde::Serialize;

/// Financing assumptions behind the detail-screen offer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MortgageTerms {
    /// Fraction of the price paid up front
    pub down_payment: f64,
    /// Annual interest rate as a fraction
    pub annual_rate: f64,
    pub years: u32,
}

impl Default for MortgageTerms {
    fn default() -> Self {
        Self {
            down_payment: 0.20,
            annual_rate: 0.029,
            years: 30,
        }
    }
}

/// Whole-dollar amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MortgageEstimate {
    pub down_payment: i64,
    pub loan_amount: i64,
    pub monthly_payment: i64,
}

impl MortgageTerms {
    /// Fixed-rate amortized payment for `price`.
    pub fn estimate(&self, price: i64) -> MortgageEstimate {
        let price = price.max(0) as f64;
        let down = price * self.down_payment;
        let principal = price - down;
        let months = f64::from(self.years.max(1) * 12);
        let rate = self.annual_rate / 12.0;

        let monthly = if rate <= 0.0 {
            principal / months
        } else {
            let growth = (1.0 + rate).powf(months);
            principal * rate * growth / (growth - 1.0)
        };

        MortgageEstimate {
            down_payment: down.round() as i64,
            loan_amount: principal.round() as i64,
            monthly_payment: monthly.round() as i64,
        }
    }
}
