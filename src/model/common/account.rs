use std::fmt::{Display, Formatter};

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::error::{Error, Result};
use crate::model::mongodb::Id;

/// The kind of account an authentication token was issued for.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum AccountKind {
    Voter = 0,
    Admin = 1,
    InecOfficial = 2,
}

impl Display for AccountKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Voter => "voter",
            Self::Admin => "admin",
            Self::InecOfficial => "INEC official",
        };
        write!(f, "{name}")
    }
}

/// An authenticated account, resolved once from the request's token.
///
/// Operations never inspect an account for roles; they ask for one of the
/// capability types below, which can only be obtained from an `Account`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Account {
    Voter(Id),
    Admin(Id),
    InecOfficial(Id),
}

impl Account {
    pub fn new(kind: AccountKind, id: Id) -> Self {
        match kind {
            AccountKind::Voter => Self::Voter(id),
            AccountKind::Admin => Self::Admin(id),
            AccountKind::InecOfficial => Self::InecOfficial(id),
        }
    }

    pub fn id(&self) -> Id {
        match *self {
            Self::Voter(id) | Self::Admin(id) | Self::InecOfficial(id) => id,
        }
    }

    pub fn kind(&self) -> AccountKind {
        match self {
            Self::Voter(_) => AccountKind::Voter,
            Self::Admin(_) => AccountKind::Admin,
            Self::InecOfficial(_) => AccountKind::InecOfficial,
        }
    }

    /// Capability to act as a voter.
    pub fn as_voter(&self) -> Result<VoterAccount> {
        match *self {
            Self::Voter(id) => Ok(VoterAccount(id)),
            _ => Err(Error::Forbidden(
                "Only registered voters can perform this action".to_string(),
            )),
        }
    }

    /// Capability to administer elections.
    pub fn as_admin(&self) -> Result<AdminAccount> {
        match *self {
            Self::Admin(id) => Ok(AdminAccount(id)),
            _ => Err(Error::Forbidden("Admin access required".to_string())),
        }
    }

    /// Capability to inspect election-wide data: admins and INEC officials.
    pub fn as_staff(&self) -> Result<StaffAccount> {
        match *self {
            Self::Admin(_) | Self::InecOfficial(_) => Ok(StaffAccount(*self)),
            Self::Voter(_) => Err(Error::Forbidden(
                "Admin or INEC Official access required".to_string(),
            )),
        }
    }
}

/// Proof that the caller is the voter with this ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoterAccount(Id);

impl VoterAccount {
    pub fn id(&self) -> Id {
        self.0
    }
}

/// Proof that the caller is an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminAccount(Id);

impl AdminAccount {
    pub fn id(&self) -> Id {
        self.0
    }
}

/// Proof that the caller is an admin or an INEC official.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaffAccount(Account);

impl StaffAccount {
    pub fn account(&self) -> Account {
        self.0
    }
}
