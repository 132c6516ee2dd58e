use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Workflow role of a user. The integer codes match the stored role table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Applicant,
    TravelAgency,
    AccountsPayable,
    AuthorizerN1,
    AuthorizerN2,
    Admin,
}

impl Role {
    pub fn code(self) -> i64 {
        match self {
            Self::Applicant => 1,
            Self::TravelAgency => 2,
            Self::AccountsPayable => 3,
            Self::AuthorizerN1 => 4,
            Self::AuthorizerN2 => 5,
            Self::Admin => 6,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Applicant),
            2 => Some(Self::TravelAgency),
            3 => Some(Self::AccountsPayable),
            4 => Some(Self::AuthorizerN1),
            5 => Some(Self::AuthorizerN2),
            6 => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn is_authorizer(self) -> bool {
        matches!(self, Self::AuthorizerN1 | Self::AuthorizerN2)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn role_codes_round_trip() {
        for code in 1..=6 {
            let role = Role::from_code(code).expect("valid code");
            assert_eq!(role.code(), code);
        }
        assert_eq!(Role::from_code(7), None);
    }

    #[test]
    fn only_n1_and_n2_are_authorizers() {
        assert!(Role::AuthorizerN1.is_authorizer());
        assert!(Role::AuthorizerN2.is_authorizer());
        assert!(!Role::Applicant.is_authorizer());
        assert!(!Role::AccountsPayable.is_authorizer());
    }
}
