#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Owner = 1,
    Hr = 2,
    Employee = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Owner),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            _ => None,
        }
    }

    /// Owners and HR may run payroll and edit tenant policy.
    pub fn is_elevated(self) -> bool {
        matches!(self, Role::Owner | Role::Hr)
    }
}
