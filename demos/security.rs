use dragon_props::{Binder, SecurityProperties};

fn main() -> Result<(), dragon_props::ConfigError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // file -> APP__SECURITY__... overrides -> ADMIN_PASSWORD for the placeholder
    let binder = Binder::builder()
        .with_file("demos/security.toml", true)
        .with_env("APP", "__")
        .with_source(
            dragon_props::config::EnvSource::new("", "__")
                .with_vars(std::env::var("ADMIN_PASSWORD").map(|p| ("ADMIN_PASSWORD", p))),
        )
        .build()?;
    let security: SecurityProperties = binder.bind_or_default("security")?;

    println!("ignored: {:?}", security.ignored());
    println!("require ssl: {}", security.require_ssl());
    println!("user: {} {:?}", security.user().name(), security.user().role());
    if security.user().is_default_password() {
        println!("using generated password: {}", security.user().password());
    }

    Ok(())
}
