use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    pub fn number(self) -> u8 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Quarter::Q1),
            2 => Some(Quarter::Q2),
            3 => Some(Quarter::Q3),
            4 => Some(Quarter::Q4),
            _ => None,
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

/// A fiscal year + quarter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuarterKey {
    pub year: u16,
    pub quarter: Quarter,
}

impl QuarterKey {
    pub const fn new(year: u16, quarter: Quarter) -> Self {
        Self { year, quarter }
    }

    /// `2020Q2`
    pub fn label(&self) -> String {
        format!("{}Q{}", self.year, self.quarter.number())
    }

    /// `2Q20`, as used in hybrid column names.
    pub fn short_label(&self) -> String {
        format!("{}Q{:02}", self.quarter.number(), self.year % 100)
    }

    /// `20Q2`, as used in wage column names.
    pub fn wage_label(&self) -> String {
        format!("{:02}Q{}", self.year % 100, self.quarter.number())
    }

    /// `Q2 2020`, as used in portal field names.
    pub fn portal_label(&self) -> String {
        format!("Q{} {}", self.quarter.number(), self.year)
    }

    /// Dotted path used in missing-field lists: `2020.Q2`.
    pub fn path(&self) -> String {
        format!("{}.{}", self.year, self.quarter)
    }
}

impl fmt::Display for QuarterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

pub const REVENUE_YEARS: [u16; 3] = [2019, 2020, 2021];
pub const CREDIT_YEARS: [u16; 2] = [2020, 2021];
pub const QUESTION_YEARS: [u16; 2] = [2020, 2021];
pub const HEADCOUNT_YEARS: [u16; 3] = [2019, 2020, 2021];

/// Every quarter of the given years, in calendar order.
pub fn quarters_of(years: &[u16]) -> Vec<QuarterKey> {
    years
        .iter()
        .flat_map(|&y| Quarter::ALL.into_iter().map(move |q| QuarterKey::new(y, q)))
        .collect()
}

/// Quarters with questionnaire answers: 2020 Q1 through 2021 Q3.
pub fn qualifying_quarters() -> Vec<QuarterKey> {
    quarters_of(&QUESTION_YEARS)
        .into_iter()
        .filter(|k| !(k.year == 2021 && k.quarter == Quarter::Q4))
        .collect()
}

/// Quarters with hybrid qualification/amount columns: 2020 Q2 through 2021 Q4.
pub fn hybrid_quarters() -> Vec<QuarterKey> {
    quarters_of(&QUESTION_YEARS)
        .into_iter()
        .filter(|k| !(k.year == 2020 && k.quarter == Quarter::Q1))
        .collect()
}

/// Four values, one per quarter of a year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearQuarters<T> {
    pub q1: T,
    pub q2: T,
    pub q3: T,
    pub q4: T,
}

impl<T> YearQuarters<T> {
    pub fn get(&self, quarter: Quarter) -> &T {
        match quarter {
            Quarter::Q1 => &self.q1,
            Quarter::Q2 => &self.q2,
            Quarter::Q3 => &self.q3,
            Quarter::Q4 => &self.q4,
        }
    }

    pub fn get_mut(&mut self, quarter: Quarter) -> &mut T {
        match quarter {
            Quarter::Q1 => &mut self.q1,
            Quarter::Q2 => &mut self.q2,
            Quarter::Q3 => &mut self.q3,
            Quarter::Q4 => &mut self.q4,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Quarter, &T)> {
        Quarter::ALL.into_iter().map(move |q| (q, self.get(q)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        let k = QuarterKey::new(2020, Quarter::Q2);
        assert_eq!(k.label(), "2020Q2");
        assert_eq!(k.short_label(), "2Q20");
        assert_eq!(k.wage_label(), "20Q2");
        assert_eq!(k.portal_label(), "Q2 2020");
        assert_eq!(QuarterKey::new(2019, Quarter::Q1).wage_label(), "19Q1");
    }

    #[test]
    fn quarter_ranges() {
        let qq = qualifying_quarters();
        assert_eq!(qq.len(), 7);
        assert_eq!(qq.first().unwrap().label(), "2020Q1");
        assert_eq!(qq.last().unwrap().label(), "2021Q3");

        let hy = hybrid_quarters();
        assert_eq!(hy.len(), 7);
        assert_eq!(hy.first().unwrap().short_label(), "2Q20");
        assert_eq!(hy.last().unwrap().short_label(), "4Q21");

        assert_eq!(quarters_of(&REVENUE_YEARS).len(), 12);
    }
}
