pub mod auth_service;
pub mod expense_service;
pub mod monthly_balance_service;
pub mod suggestion_matcher;
pub mod suggestion_service;
pub mod taxonomy_service;

pub use auth_service::{AuthError, AuthService, AuthServiceImpl, AuthSettings};
pub use expense_service::{ExpenseError, ExpenseService, ExpenseServiceImpl};
pub use monthly_balance_service::{
    MonthlyBalanceError, MonthlyBalanceService, MonthlyBalanceServiceImpl,
};
pub use suggestion_service::{SuggestionError, SuggestionService, SuggestionServiceImpl};
pub use taxonomy_service::{
    CategorySyncFailure, SyncError, SyncReport, TaxonomyError, TaxonomyService,
    TaxonomyServiceImpl,
};
