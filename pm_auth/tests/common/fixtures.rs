use pm_auth::Role;

/// Initial password given to every provisioned test account
pub const INITIAL_PASSWORD: &str = "Initial123";

/// Password used when a flow changes or resets the initial one
pub const NEXT_PASSWORD: &str = "Changed456";

pub const WRONG_PASSWORD: &str = "Wrong78901";

/// Test account fixtures for integration testing
pub struct TestAccounts;

impl TestAccounts {
    pub fn admin() -> TestAccount {
        TestAccount {
            email: "admin@example.com",
            name: "Admin Test User",
            role: Role::Admin,
        }
    }

    pub fn manager() -> TestAccount {
        TestAccount {
            email: "manager@example.com",
            name: "Manager Test User",
            role: Role::Manager,
        }
    }

    pub fn member() -> TestAccount {
        TestAccount {
            email: "member@example.com",
            name: "Member Test User",
            role: Role::User,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TestAccount {
    pub email: &'static str,
    pub name: &'static str,
    pub role: Role,
}
