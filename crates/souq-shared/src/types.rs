use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

// Chat user identity = numeric id assigned by the transport
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ParseError;

    /// Parse a user id typed by a human: surrounding whitespace is ignored,
    /// anything else that is not a signed 64-bit integer is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .parse::<i64>()
            .map(Self)
            .map_err(|_| ParseError::InvalidId(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TicketId(pub i64);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered admin tier. Higher levels may manage lower ones.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "i64", into = "i64")]
pub struct AdminLevel(u8);

impl AdminLevel {
    pub const MODERATOR: Self = Self(1);
    pub const MANAGER: Self = Self(2);
    pub const OWNER: Self = Self(3);

    pub fn new(level: i64) -> Result<Self, ParseError> {
        match level {
            1..=3 => Ok(Self(level as u8)),
            other => Err(ParseError::InvalidAdminLevel(other)),
        }
    }

    pub fn get(self) -> i64 {
        i64::from(self.0)
    }
}

impl TryFrom<i64> for AdminLevel {
    type Error = ParseError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AdminLevel> for i64 {
    fn from(level: AdminLevel) -> Self {
        level.get()
    }
}

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shop categories reachable from the catalog menu.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Digital,
    Clothing,
    Books,
    Gifts,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Digital,
        Category::Clothing,
        Category::Books,
        Category::Gifts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Digital => "digital",
            Category::Clothing => "clothing",
            Category::Books => "books",
            Category::Gifts => "gifts",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseError::UnknownCategory(s.to_string()))
    }
}

/// Profile rank derived from accumulated points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Bronze,
    Silver,
    Gold,
    Diamond,
}

impl Rank {
    pub fn from_points(points: i64) -> Self {
        match points {
            p if p >= 1000 => Rank::Diamond,
            p if p >= 500 => Rank::Gold,
            p if p >= 100 => Rank::Silver,
            _ => Rank::Bronze,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rank::Bronze => "🥉 Bronze",
            Rank::Silver => "🥈 Silver",
            Rank::Gold => "🥇 Gold",
            Rank::Diamond => "💎 Diamond",
        };
        f.write_str(label)
    }
}
