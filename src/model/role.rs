use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin = 1,
    AgilityEmployee = 2,
    LyfEmployee = 3,
}

/// The two companies whose staff share this system.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Company {
    Agility,
    Lyfshilp,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::AgilityEmployee),
            3 => Some(Role::LyfEmployee),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn is_employee(self) -> bool {
        self.company().is_some()
    }

    pub fn company(self) -> Option<Company> {
        match self {
            Role::Admin => None,
            Role::AgilityEmployee => Some(Company::Agility),
            Role::LyfEmployee => Some(Company::Lyfshilp),
        }
    }

    pub fn for_company(company: Company) -> Self {
        match company {
            Company::Agility => Role::AgilityEmployee,
            Company::Lyfshilp => Role::LyfEmployee,
        }
    }
}
