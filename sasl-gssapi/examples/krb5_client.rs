/*
Start a kerberos 5 negotiation against a service and print the first
token the client would send. You need a working kerberos environment:

* a valid krb5.conf
* a KDC for your realm
* either a TGT in your ticket cache (see klist), or a principal and
  password in SASL_GSSAPI_USER and SASL_GSSAPI_PASSWORD

SASL_GSSAPI_AUTHZ sets the authorization identity to request.

cargo run --features krb5 --example krb5_client ldap ldap.example.com

When using MIT Kerberos, KRB5_TRACE=/dev/stderr shows what the library
is doing, and RUST_LOG=debug shows what this crate is doing.
*/
use sasl_gssapi::{krb5::Gssapi, ClientConfig, ClientCtx, Error, Step};
use std::env::{args, var};
use tracing_subscriber::EnvFilter;

fn run(provider: &Gssapi, cfg: &ClientConfig) -> Result<(), Error> {
    let cred = cfg.acquire_credential(provider)?;
    println!("acquired credentials: {:?}", cred);
    println!("authenticating as {}", cfg.principal(&cred)?);
    println!("requesting authorization as {}", cfg.authz_identity(&cred)?);
    let mut ctx = ClientCtx::new(provider);
    match cfg.step(&cred, &mut ctx, None)? {
        Step::Continue(tok) => {
            println!("send {} byte token to {}, then wait for its reply", tok.len(), cfg.target())
        }
        Step::Complete(tok) => println!(
            "context established in one step, final token is {} bytes",
            tok.map_or(0, |t| t.len())
        ),
    }
    ctx.delete()
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = args().collect::<Vec<_>>();
    if args.len() != 3 {
        println!("usage: {}: <service> <host>", args[0]);
        return;
    }
    let mut cfg = ClientConfig::new(&args[1], &args[2]);
    cfg.username = var("SASL_GSSAPI_USER").ok();
    cfg.password = var("SASL_GSSAPI_PASSWORD").ok();
    cfg.authz = var("SASL_GSSAPI_AUTHZ").ok();
    let provider = Gssapi;
    if let Err(e) = run(&provider, &cfg) {
        match e.describe(&provider) {
            Ok(desc) => println!("{}: {}", e, desc),
            Err(_) => println!("{}", e),
        }
    }
}
