pub mod admin;
pub mod kernel;
pub mod managed_host;
pub mod panel_setting;
pub mod server_node;
pub mod user;

pub use admin::Entity as Admin;
pub use kernel::Entity as Kernel;
pub use managed_host::Entity as ManagedHost;
pub use panel_setting::Entity as PanelSetting;
pub use server_node::Entity as ServerNode;
pub use user::Entity as User;
