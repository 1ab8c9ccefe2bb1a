//! Back-office resources: CRM contacts, the property register and procurement.

pub mod contact;
pub mod order_line;
pub mod property;
pub mod purchase_order;
pub mod unit;

pub use contact::Contact;
pub use order_line::OrderLine;
pub use property::Property;
pub use purchase_order::{PurchaseOrder, PurchaseOrderStatus};
pub use unit::{Unit, UnitStatus};
