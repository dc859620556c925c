pub mod broker;
pub mod client_lookup;
pub mod grouped_index;
pub mod query_log;
pub mod resolver;
pub mod validator;

pub use broker::{BlockingToggle, BrokerEvent, SharedStateBroker};
pub use client_lookup::ClientNameLookup;
pub use grouped_index::{GroupedRuleIndex, RuleIndexFactory, RuleQuery};
pub use query_log::{QueryLogEntry, QueryLogWriter};
pub use resolver::ChainResolver;
pub use validator::{NullValidator, ResponseValidator};
