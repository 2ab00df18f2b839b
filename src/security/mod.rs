//! Security settings bound from the `security` namespace.
//!
//! These are plain settings: nothing here enforces access control.

use serde::Serialize;
use tracing::debug;

use crate::config::convert::{relaxed_eq, FromProperty};
use crate::config::{BindContext, Bindable, ConfigError, PropertyValue};

/// Order applied to the filter chain unless `filter-order` is set.
pub const DEFAULT_FILTER_ORDER: i32 = -100;

/// Order applied to the basic-auth rules.
pub const BASIC_AUTH_ORDER: i32 = i32::MAX - 5;

/// Order that puts custom rules ahead of basic auth.
pub const ACCESS_OVERRIDE_ORDER: i32 = BASIC_AUTH_ORDER - 2;

/// Order applied to the ignored paths, ahead of everything else.
pub const IGNORED_ORDER: i32 = i32::MIN;

/// Sentinel for `ignored` that switches path ignoring off.
pub const IGNORED_NONE: &str = "none";

/// Settings under the `security` prefix.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SecurityProperties {
    require_ssl: bool,
    enable_csrf: bool,
    sessions: SessionCreationPolicy,
    ignored: Vec<String>,
    filter_order: i32,
    filter_dispatcher_types: Vec<DispatcherType>,
    basic: Basic,
    headers: Headers,
    user: User,
}

impl Default for SecurityProperties {
    fn default() -> Self {
        Self {
            require_ssl: false,
            enable_csrf: false,
            sessions: SessionCreationPolicy::Stateless,
            ignored: Vec::new(),
            filter_order: DEFAULT_FILTER_ORDER,
            filter_dispatcher_types: vec![
                DispatcherType::Async,
                DispatcherType::Error,
                DispatcherType::Request,
            ],
            basic: Basic::default(),
            headers: Headers::default(),
            user: User::default(),
        }
    }
}

impl SecurityProperties {
    pub fn require_ssl(&self) -> bool {
        self.require_ssl
    }

    pub fn enable_csrf(&self) -> bool {
        self.enable_csrf
    }

    pub fn sessions(&self) -> SessionCreationPolicy {
        self.sessions
    }

    /// Path patterns excluded from security, in configured order.
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    /// True when `ignored` holds only the `none` sentinel (any case).
    pub fn ignoring_disabled(&self) -> bool {
        matches!(self.ignored.as_slice(), [only] if only.eq_ignore_ascii_case(IGNORED_NONE))
    }

    pub fn filter_order(&self) -> i32 {
        self.filter_order
    }

    pub fn filter_dispatcher_types(&self) -> &[DispatcherType] {
        &self.filter_dispatcher_types
    }

    pub fn basic(&self) -> &Basic {
        &self.basic
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn user_mut(&mut self) -> &mut User {
        &mut self.user
    }
}

impl Bindable for SecurityProperties {
    fn bind_properties(&mut self, ctx: &mut BindContext<'_>) -> Result<(), ConfigError> {
        ctx.scalar("require-ssl", &mut self.require_ssl)?;
        ctx.scalar("enable-csrf", &mut self.enable_csrf)?;
        ctx.scalar("sessions", &mut self.sessions)?;
        ctx.list("ignored", &mut self.ignored)?;
        ctx.scalar("filter-order", &mut self.filter_order)?;
        ctx.list("filter-dispatcher-types", &mut self.filter_dispatcher_types)?;
        ctx.nested("basic", &mut self.basic)?;
        ctx.nested("headers", &mut self.headers)?;
        ctx.nested("user", &mut self.user)?;
        Ok(())
    }
}

/// HTTP basic authentication settings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Basic {
    pub enabled: bool,
    pub realm: String,
    pub path: Vec<String>,
    pub authorize_mode: AuthorizeMode,
}

impl Default for Basic {
    fn default() -> Self {
        Self {
            enabled: true,
            realm: "Realm".to_string(),
            path: vec!["/**".to_string()],
            authorize_mode: AuthorizeMode::Role,
        }
    }
}

impl Bindable for Basic {
    fn bind_properties(&mut self, ctx: &mut BindContext<'_>) -> Result<(), ConfigError> {
        ctx.scalar("enabled", &mut self.enabled)?;
        ctx.scalar("realm", &mut self.realm)?;
        ctx.list("path", &mut self.path)?;
        ctx.scalar("authorize-mode", &mut self.authorize_mode)?;
        Ok(())
    }
}

/// Response header settings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Headers {
    pub xss: bool,
    pub cache: bool,
    pub frame: bool,
    pub content_type: bool,
    pub hsts: HstsMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_security_policy: Option<String>,
    pub content_security_policy_mode: ContentSecurityPolicyMode,
}

impl Default for Headers {
    fn default() -> Self {
        Self {
            xss: true,
            cache: true,
            frame: true,
            content_type: true,
            hsts: HstsMode::All,
            content_security_policy: None,
            content_security_policy_mode: ContentSecurityPolicyMode::Default,
        }
    }
}

impl Bindable for Headers {
    fn bind_properties(&mut self, ctx: &mut BindContext<'_>) -> Result<(), ConfigError> {
        ctx.scalar("xss", &mut self.xss)?;
        ctx.scalar("cache", &mut self.cache)?;
        ctx.scalar("frame", &mut self.frame)?;
        ctx.scalar("content-type", &mut self.content_type)?;
        ctx.scalar("hsts", &mut self.hsts)?;
        ctx.optional("content-security-policy", &mut self.content_security_policy)?;
        ctx.scalar(
            "content-security-policy-mode",
            &mut self.content_security_policy_mode,
        )?;
        Ok(())
    }
}

/// The default user's credentials.
///
/// Starts with a random password. The password is replaced only by a
/// non-empty, fully resolved value; until then [`is_default_password`]
/// reports `true`.
///
/// [`is_default_password`]: User::is_default_password
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct User {
    name: String,
    #[serde(skip)]
    password: String,
    role: Vec<String>,
    #[serde(skip)]
    default_password: bool,
}

impl Default for User {
    fn default() -> Self {
        Self {
            name: "user".to_string(),
            password: uuid::Uuid::new_v4().to_string(),
            role: vec!["USER".to_string()],
            default_password: true,
        }
    }
}

impl User {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Replaces the password. An empty password is ignored.
    pub fn set_password(&mut self, password: impl Into<String>) {
        let password = password.into();
        if password.is_empty() {
            return;
        }
        self.password = password;
        self.default_password = false;
    }

    /// Roles in configured order.
    pub fn role(&self) -> &[String] {
        &self.role
    }

    pub fn set_role<I, S>(&mut self, role: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.role = role.into_iter().map(Into::into).collect();
    }

    pub fn is_default_password(&self) -> bool {
        self.default_password
    }
}

impl Bindable for User {
    fn bind_properties(&mut self, ctx: &mut BindContext<'_>) -> Result<(), ConfigError> {
        ctx.scalar("name", &mut self.name)?;
        match ctx.value("password")? {
            Some(PropertyValue::Resolved(password)) if !password.is_empty() => {
                self.set_password(password);
                ctx.mark_bound();
            }
            Some(PropertyValue::Unresolved { missing, .. }) => {
                debug!(
                    ?missing,
                    "password has unresolved placeholders, keeping generated password"
                );
            }
            _ => {}
        }
        ctx.list("role", &mut self.role)?;
        Ok(())
    }
}

macro_rules! property_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $constant:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
        pub enum $name {
            $(
                #[serde(rename = $constant)]
                $variant,
            )+
        }

        impl FromProperty for $name {
            const TYPE_NAME: &'static str = stringify!($name);

            fn from_property(value: &str) -> Option<Self> {
                $(
                    if relaxed_eq(value, $constant) {
                        return Some($name::$variant);
                    }
                )+
                None
            }
        }
    };
}

property_enum!(
    /// When a session is created for a request.
    SessionCreationPolicy {
        Always => "ALWAYS",
        Never => "NEVER",
        IfRequired => "IF_REQUIRED",
        Stateless => "STATELESS",
    }
);

property_enum!(
    /// Which requests basic auth demands a role for.
    AuthorizeMode {
        Role => "ROLE",
        Authenticated => "AUTHENTICATED",
        None => "NONE",
    }
);

property_enum!(
    /// Where the Strict-Transport-Security header is sent.
    HstsMode {
        None => "NONE",
        Domain => "DOMAIN",
        All => "ALL",
    }
);

property_enum!(
    ContentSecurityPolicyMode {
        Default => "DEFAULT",
        ReportOnly => "REPORT_ONLY",
    }
);

property_enum!(
    /// Request dispatch kinds the filter chain is registered for.
    DispatcherType {
        Async => "ASYNC",
        Error => "ERROR",
        Forward => "FORWARD",
        Include => "INCLUDE",
        Request => "REQUEST",
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Binder, EnvSource, FileSource, MapSource};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn bind_source(source: MapSource) -> SecurityProperties {
        let mut security = SecurityProperties::default();
        Binder::new(source)
            .unwrap()
            .bind("security", &mut security)
            .unwrap();
        security
    }

    fn bind(name: &str, value: &str) -> SecurityProperties {
        bind_source(MapSource::single(name, value))
    }

    #[test]
    fn test_binding_ignored_single_valued() {
        let security = bind("security.ignored", "/css/**");
        assert_eq!(security.ignored(), ["/css/**"]);
    }

    #[test]
    fn test_binding_ignored_empty() {
        let security = bind("security.ignored", "");
        assert!(security.ignored().is_empty());
    }

    #[test]
    fn test_binding_ignored_disable() {
        let security = bind("security.ignored", "none");
        assert_eq!(security.ignored().len(), 1);
        assert!(security.ignoring_disabled());
    }

    #[test]
    fn test_binding_ignored_multi_valued() {
        let security = bind("security.ignored", "/css/**,/images/**");
        assert_eq!(security.ignored(), ["/css/**", "/images/**"]);
        assert!(!security.ignoring_disabled());
    }

    #[test]
    fn test_binding_ignored_multi_valued_list() {
        let security = bind_source(MapSource::new([
            ("security.ignored[0]", "/css/**"),
            ("security.ignored[1]", "/foo/**"),
        ]));
        assert_eq!(security.ignored().len(), 2);
        assert!(security.ignored().iter().any(|p| p == "/foo/**"));
    }

    #[test]
    fn test_default_password_autogenerated_if_unresolved_placeholder() {
        let security = bind("security.user.password", "${ADMIN_PASSWORD}");
        assert!(security.user().is_default_password());
        assert_ne!(security.user().password(), "${ADMIN_PASSWORD}");
    }

    #[test]
    fn test_default_password_autogenerated_if_empty() {
        let security = bind("security.user.password", "");
        assert!(security.user().is_default_password());
        assert!(!security.user().password().is_empty());
    }

    #[test]
    fn test_explicit_password_clears_default_flag() {
        let security = bind("security.user.password", "s3cret");
        assert!(!security.user().is_default_password());
        assert_eq!(security.user().password(), "s3cret");
    }

    #[test]
    fn test_password_placeholder_resolved_from_environment() {
        let binder = Binder::builder()
            .with_map(MapSource::single("security.user.password", "${ADMIN_PASSWORD}"))
            .with_source(EnvSource::new("", "__").with_vars([("ADMIN_PASSWORD", "from-env")]))
            .build()
            .unwrap();

        let security: SecurityProperties = binder.bind_or_default("security").unwrap();

        assert!(!security.user().is_default_password());
        assert_eq!(security.user().password(), "from-env");
    }

    #[test]
    fn test_roles() {
        let security = bind("security.user.role", "USER,ADMIN");
        assert_eq!(security.user().role(), ["USER", "ADMIN"]);
        assert_eq!(format!("{:?}", security.user().role()), r#"["USER", "ADMIN"]"#);
    }

    #[test]
    fn test_role() {
        let security = bind("security.user.role", "ADMIN");
        assert_eq!(security.user().role(), ["ADMIN"]);
    }

    #[test]
    fn test_defaults() {
        let security = SecurityProperties::default();

        assert!(security.ignored().is_empty());
        assert!(!security.require_ssl());
        assert_eq!(security.filter_order(), DEFAULT_FILTER_ORDER);
        assert_eq!(security.sessions(), SessionCreationPolicy::Stateless);
        assert_eq!(security.basic().path, ["/**"]);
        assert_eq!(security.headers().hsts, HstsMode::All);
        assert_eq!(security.user().name(), "user");
        assert_eq!(security.user().role(), ["USER"]);
        assert!(security.user().is_default_password());
        assert!(ACCESS_OVERRIDE_ORDER < BASIC_AUTH_ORDER);
    }

    #[test]
    fn test_generated_passwords_differ() {
        assert_ne!(User::default().password(), User::default().password());
    }

    #[test]
    fn test_enums_bind_relaxed() {
        let security = bind_source(MapSource::new([
            ("security.sessions", "if-required"),
            ("security.basic.authorize-mode", "authenticated"),
            ("security.headers.hsts", "domain"),
            ("security.headers.content-security-policy-mode", "report_only"),
            ("security.filter-dispatcher-types", "REQUEST, FORWARD"),
        ]));

        assert_eq!(security.sessions(), SessionCreationPolicy::IfRequired);
        assert_eq!(security.basic().authorize_mode, AuthorizeMode::Authenticated);
        assert_eq!(security.headers().hsts, HstsMode::Domain);
        assert_eq!(
            security.headers().content_security_policy_mode,
            ContentSecurityPolicyMode::ReportOnly
        );
        assert_eq!(
            security.filter_dispatcher_types(),
            [DispatcherType::Request, DispatcherType::Forward]
        );
    }

    #[test]
    fn test_unknown_enum_constant_is_error() {
        let mut security = SecurityProperties::default();
        let binder = Binder::new(MapSource::single("security.sessions", "sometimes")).unwrap();

        let result = binder.bind("security", &mut security);

        assert!(matches!(
            result,
            Err(ConfigError::Conversion {
                target: "SessionCreationPolicy",
                ..
            })
        ));
    }

    #[test]
    fn test_binds_from_toml_file_and_env() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [security]
            require-ssl = true
            filter-order = 10
            ignored = ["/css/**", "/js/**"]

            [security.basic]
            realm = "Admin"

            [security.headers]
            content-security-policy = "default-src 'self'"

            [security.user]
            name = "admin"
            role = "ADMIN,OPS"
            "#
        )
        .unwrap();

        let binder = Binder::builder()
            .with_file(file.path(), true)
            .with_source(
                EnvSource::new("APP", "__").with_vars([("APP__SECURITY__FILTER_ORDER", "20")]),
            )
            .build()
            .unwrap();
        let security: SecurityProperties = binder.bind_or_default("security").unwrap();

        assert!(security.require_ssl());
        assert_eq!(security.filter_order(), 20);
        assert_eq!(security.ignored(), ["/css/**", "/js/**"]);
        assert_eq!(security.basic().realm, "Admin");
        assert_eq!(
            security.headers().content_security_policy.as_deref(),
            Some("default-src 'self'")
        );
        assert_eq!(security.user().name(), "admin");
        assert_eq!(security.user().role(), ["ADMIN", "OPS"]);
    }

    #[test]
    fn test_empty_toml_arrays_clear_lists() {
        let mut base = NamedTempFile::new().unwrap();
        writeln!(base, "[security]\nignored = [\"/css/**\"]").unwrap();
        let mut local = NamedTempFile::new().unwrap();
        writeln!(
            local,
            "[security]\nignored = []\n[security.user]\nrole = []\n[security.basic]\npath = []"
        )
        .unwrap();

        let binder = Binder::builder()
            .with_file(base.path(), true)
            .with_file(local.path(), true)
            .build()
            .unwrap();
        let mut security = SecurityProperties::default();

        let bound = binder.bind("security", &mut security).unwrap();

        assert!(bound);
        assert!(security.ignored().is_empty());
        assert!(security.user().role().is_empty());
        assert!(security.basic().path.is_empty());
    }

    #[test]
    fn test_missing_optional_file_keeps_defaults() {
        let binder = Binder::builder()
            .with_source(FileSource::new("/nonexistent/security.toml", false))
            .build()
            .unwrap();
        let mut security = SecurityProperties::default();

        let bound = binder.bind("security", &mut security).unwrap();

        assert!(!bound);
        assert_eq!(security.filter_order(), DEFAULT_FILTER_ORDER);
    }

    #[test]
    fn test_renders_as_toml_without_password() {
        let mut security = bind("security.require-ssl", "true");
        security.user_mut().set_password("hunter2");

        let rendered = toml::to_string(&security).unwrap();

        assert!(rendered.contains("require-ssl = true"));
        assert!(rendered.contains("sessions = \"STATELESS\""));
        assert!(!rendered.contains("hunter2"));
    }
}
