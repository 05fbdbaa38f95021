use super::error::AuthError;

/// Microsoft identity platform host; the tenant is appended as a path segment.
pub const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// OAuth 2.0 endpoints of one tenant's authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authority: String,
    pub device_code: String,
    pub token: String,
    pub authorize: String,
}

impl Endpoints {
    /// Endpoints under `{host}/{tenant}/oauth2/v2.0/`.
    ///
    /// `tenant` is `common`, `organizations`, `consumers`, a tenant GUID or a
    /// verified domain.
    pub fn for_tenant(host: &str, tenant: &str) -> Result<Self, AuthError> {
        let tenant = tenant.trim();
        if tenant.is_empty()
            || !tenant
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
        {
            return Err(AuthError::InvalidTenant(tenant.to_string()));
        }
        let authority = format!("{}/{}", host.trim_end_matches('/'), tenant);
        Ok(Self {
            device_code: format!("{}/oauth2/v2.0/devicecode", authority),
            token: format!("{}/oauth2/v2.0/token", authority),
            authorize: format!("{}/oauth2/v2.0/authorize", authority),
            authority,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_tenant() {
        let e = Endpoints::for_tenant(AUTHORITY_HOST, "common").unwrap();
        assert_eq!(e.authority, "https://login.microsoftonline.com/common");
        assert_eq!(
            e.device_code,
            "https://login.microsoftonline.com/common/oauth2/v2.0/devicecode"
        );
        assert_eq!(
            e.token,
            "https://login.microsoftonline.com/common/oauth2/v2.0/token"
        );
        assert_eq!(
            e.authorize,
            "https://login.microsoftonline.com/common/oauth2/v2.0/authorize"
        );
    }

    #[test]
    fn test_guid_and_domain_tenants() {
        assert!(Endpoints::for_tenant(AUTHORITY_HOST, "72f988bf-86f1-41af-91ab-2d7cd011db47").is_ok());
        assert!(Endpoints::for_tenant(AUTHORITY_HOST, "contoso.onmicrosoft.com").is_ok());
    }

    #[test]
    fn test_rejects_bad_tenant() {
        assert!(matches!(
            Endpoints::for_tenant(AUTHORITY_HOST, ""),
            Err(AuthError::InvalidTenant(_))
        ));
        assert!(matches!(
            Endpoints::for_tenant(AUTHORITY_HOST, "a/b"),
            Err(AuthError::InvalidTenant(_))
        ));
    }

    #[test]
    fn test_trailing_slash_host() {
        let e = Endpoints::for_tenant("http://127.0.0.1:9000/", "common").unwrap();
        assert_eq!(e.token, "http://127.0.0.1:9000/common/oauth2/v2.0/token");
    }
}
