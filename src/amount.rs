use std::fmt;

/// Amount of money in the smallest currency unit (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cents(u64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    const PER_UNIT: u64 = 100;

    pub const fn new(value: u64) -> Self {
        Cents(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Subtract `rhs`, returning `None` if it would go below zero.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Cents)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::PER_UNIT;
        let frac = self.0 % Self::PER_UNIT;
        write!(f, "{whole}.{frac:02}")
    }
}

impl std::ops::Add for Cents {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Cents(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Cents {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Cents {
    type Output = Self;

    /// Callers compare before subtracting; underflow is a logic error.
    fn sub(self, rhs: Self) -> Self::Output {
        Cents(self.0 - rhs.0)
    }
}

impl std::ops::SubAssign for Cents {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl std::ops::Mul<u32> for Cents {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self::Output {
        Cents(self.0 * u64::from(rhs))
    }
}

impl std::iter::Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Cents::ZERO, |acc, c| acc + c)
    }
}
