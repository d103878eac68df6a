//! Request handlers, one module per resource group

pub mod books;
pub mod health;
pub mod invoices;
pub mod ledger;
pub mod payments;
