pub mod disbursement_service;
pub mod goals_service;
pub mod ledger_service;
pub mod payment_service;
pub mod provider_client;

pub use disbursement_service::DisbursementService;
pub use goals_service::GoalsService;
pub use ledger_service::{LedgerService, ReconciliationResult};
pub use payment_service::{InitializeResult, PaymentService};
pub use provider_client::{HttpProviderClient, ProviderClient};
