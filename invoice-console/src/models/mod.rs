pub mod amount;
pub mod invoice;
pub mod party;
pub mod stats;
pub mod transaction;

pub use invoice::{CreateInvoiceRequest, Invoice, InvoiceStatus, UpdateInvoiceRequest};
pub use party::{
    BusinessOwner, CreateBusinessOwnerRequest, CreateCustomerRequest, Customer,
    UpdateBusinessOwnerRequest, UpdateCustomerRequest,
};
pub use stats::InvoiceStats;
pub use transaction::{PaymentStatus, PaymentTransaction, TransactionType};
