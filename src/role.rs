/// Decides whether a member is the tracked person by role name.
#[derive(Clone, Debug)]
pub struct RoleMatcher {
    target: String,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl RoleMatcher {
    pub fn new(role_name: &str) -> Self {
        Self {
            target: normalize(role_name),
        }
    }

    pub fn is_tracked<'a, I>(&self, role_names: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        role_names.into_iter().any(|n| normalize(n) == self.target)
    }
}
