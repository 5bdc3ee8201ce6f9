//! Default TrackStar role catalogue.
//!
//! Roles form the chain `admin > owner > member > reader`; operations are
//! leaf roles hanging below the narrowest role allowed to perform them.

/// Site-wide administrator role.
pub const ADMIN_ROLE: &str = "admin";
/// Project owner role.
pub const OWNER_ROLE: &str = "owner";
/// Project member role.
pub const MEMBER_ROLE: &str = "member";
/// Read-only project role.
pub const READER_ROLE: &str = "reader";

/// One catalogue entry: a role name and the parent it hangs below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogueRole {
    /// Role name.
    pub name: &'static str,
    /// Parent role name.
    pub parent: Option<&'static str>,
}

const fn entry(name: &'static str, parent: Option<&'static str>) -> CatalogueRole {
    CatalogueRole { name, parent }
}

/// Returns the catalogue ordered so that every parent precedes its children.
#[must_use]
pub fn default_role_catalogue() -> &'static [CatalogueRole] {
    const CATALOGUE: &[CatalogueRole] = &[
        entry(ADMIN_ROLE, None),
        entry(OWNER_ROLE, Some(ADMIN_ROLE)),
        entry(MEMBER_ROLE, Some(OWNER_ROLE)),
        entry(READER_ROLE, Some(MEMBER_ROLE)),
        entry("createUser", Some(OWNER_ROLE)),
        entry("updateUser", Some(OWNER_ROLE)),
        entry("deleteUser", Some(OWNER_ROLE)),
        entry("updateProject", Some(OWNER_ROLE)),
        entry("deleteProject", Some(OWNER_ROLE)),
        entry("createIssue", Some(MEMBER_ROLE)),
        entry("updateIssue", Some(MEMBER_ROLE)),
        entry("deleteIssue", Some(MEMBER_ROLE)),
        entry("readUser", Some(READER_ROLE)),
        entry("readProject", Some(READER_ROLE)),
        entry("readIssue", Some(READER_ROLE)),
    ];

    CATALOGUE
}
