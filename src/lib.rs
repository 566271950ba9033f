//! sqadmin - administration client for line-oriented server query protocols.
//!
//! Opens a query connection, logs in, selects a virtual server and issues
//! typed administrative commands. The wire protocol lives in
//! [`squery_proto`]; this crate adds the session, the command façade and
//! the ambient configuration and logging.
//!
//! ```no_run
//! use sqadmin::{Config, Session};
//! use sqadmin::admin::ClientListFlag;
//!
//! # async fn run() -> sqadmin::AdminResult<()> {
//! let config = Config::load("sqadmin.toml")?;
//! let session = Session::connect(&config).await?;
//! session.login("serveradmin", "secret").await?;
//!
//! let admin = session.admin();
//! admin.select_server(1).await?;
//! for client in admin.client_list(&[ClientListFlag::Uid]).await? {
//!     println!("{} {}", client.id, client.nickname);
//! }
//! session.close().await;
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod config;
pub mod entity;
pub mod error;
pub mod session;
pub mod telemetry;

pub use admin::ServerAdmin;
pub use config::Config;
pub use error::{AdminError, AdminResult};
pub use session::Session;
