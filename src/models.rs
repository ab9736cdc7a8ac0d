pub mod auth;
pub mod category;
pub mod default_taxonomy;
pub mod expense;
pub mod filters;
pub mod monthly_balance;
pub mod suggestion;
pub mod user;

pub use auth::{AuthToken, LoginRequest};
pub use category::{
    CategoryDefinition, CategoryType, ExpenseCategory, ExpenseCategoryResponse,
    ExpenseSubcategory, SubcategoryDefinition,
};
pub use default_taxonomy::default_taxonomy;
pub use expense::{CreateExpenseRequest, Expense, ExpenseSumByType, ExpensesMonthlyAverage};
pub use filters::{DateRange, DeleteResult, PageQuery, PaginationData};
pub use monthly_balance::{CreateMonthlyBalanceRequest, MonthlyBalance};
pub use suggestion::{
    CreateSuggestionRequest, DayOfMonth, InvalidDayError, RecurringExpenseSuggestion,
    SuggestedExpense, SuggestedExpenseInput, UpdateSuggestionRequest,
};
pub use user::{CreateUserRequest, User};
