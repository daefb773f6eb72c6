//! Semantic classification of function calls.
//!
//! An [`OpKind`] records *what* a call does (its domain and operation) rather
//! than which library spelled it, so analyses can reason about database
//! access, HTTP traffic, or queue interaction uniformly across languages and
//! frameworks. Enrichment attaches an `OpKind` to matching
//! [`MetaNode::FunctionCall`] metadata.
//!
//! [`MetaNode::FunctionCall`]: crate::MetaNode::FunctionCall

use std::fmt;

use serde::Serialize;

/// The semantic domain of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[derive(strum::Display, strum::EnumString, strum::VariantArray)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Database access.
    Db,
    /// HTTP traffic.
    Http,
    /// Authentication and authorization.
    Auth,
    /// Cache access.
    Cache,
    /// Message queue interaction.
    Queue,
    /// File system access.
    File,
    /// Third-party service calls.
    ExternalApi,
}

impl Domain {
    /// Gets every domain.
    pub fn all() -> &'static [Domain] {
        use strum::VariantArray;
        Domain::VARIANTS
    }
}

/// A database operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum DbOperation {
    Retrieve,
    RetrieveAll,
    Query,
    Create,
    Update,
    Delete,
    Transaction,
    Preload,
    Aggregate,
}

/// An HTTP operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum HttpOperation {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Request,
    Stream,
}

/// An authentication or authorization operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum AuthOperation {
    Login,
    Logout,
    Authenticate,
    Register,
    VerifyToken,
    GenerateToken,
    RefreshToken,
    HashPassword,
    VerifyPassword,
    Authorize,
    Oauth,
    Session,
}

/// A cache operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum CacheOperation {
    Get,
    Set,
    Delete,
    Clear,
    Invalidate,
    Expire,
    Exists,
    Increment,
    Decrement,
    Ttl,
    Fetch,
}

/// A message queue operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum QueueOperation {
    Publish,
    Consume,
    Subscribe,
    Acknowledge,
    Reject,
    Enqueue,
    Dequeue,
    Schedule,
    Retry,
    Process,
}

/// A file system operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum FileOperation {
    Read,
    Write,
    Append,
    Delete,
    Copy,
    Move,
    Exists,
    Stat,
    Mkdir,
    Rmdir,
    List,
    Open,
    Close,
}

/// A third-party service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum ExternalApiOperation {
    Call,
    Upload,
    Download,
    Send,
    Charge,
    Webhook,
    Search,
    Sync,
}

/// An operation within a semantic domain.
///
/// The operation's domain is part of its type, so an operation can never be
/// paired with the wrong domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Operation {
    /// A database operation.
    Db(DbOperation),
    /// An HTTP operation.
    Http(HttpOperation),
    /// An authentication or authorization operation.
    Auth(AuthOperation),
    /// A cache operation.
    Cache(CacheOperation),
    /// A message queue operation.
    Queue(QueueOperation),
    /// A file system operation.
    File(FileOperation),
    /// A third-party service operation.
    ExternalApi(ExternalApiOperation),
}

impl Operation {
    /// Gets the domain the operation belongs to.
    pub fn domain(&self) -> Domain {
        match self {
            Self::Db(_) => Domain::Db,
            Self::Http(_) => Domain::Http,
            Self::Auth(_) => Domain::Auth,
            Self::Cache(_) => Domain::Cache,
            Self::Queue(_) => Domain::Queue,
            Self::File(_) => Domain::File,
            Self::ExternalApi(_) => Domain::ExternalApi,
        }
    }

    /// Resolves a textual operation name within the given domain.
    ///
    /// Returns `None` when the name does not belong to the domain's closed
    /// operation set; the check happens at enrichment time.
    pub fn parse(domain: Domain, name: &str) -> Option<Operation> {
        match domain {
            Domain::Db => name.parse().ok().map(Self::Db),
            Domain::Http => name.parse().ok().map(Self::Http),
            Domain::Auth => name.parse().ok().map(Self::Auth),
            Domain::Cache => name.parse().ok().map(Self::Cache),
            Domain::Queue => name.parse().ok().map(Self::Queue),
            Domain::File => name.parse().ok().map(Self::File),
            Domain::ExternalApi => name.parse().ok().map(Self::ExternalApi),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Db(op) => op.fmt(f),
            Self::Http(op) => op.fmt(f),
            Self::Auth(op) => op.fmt(f),
            Self::Cache(op) => op.fmt(f),
            Self::Queue(op) => op.fmt(f),
            Self::File(op) => op.fmt(f),
            Self::ExternalApi(op) => op.fmt(f),
        }
    }
}

/// The semantic classification attached to a function call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpKind {
    /// The semantic domain of the call.
    pub domain: Domain,
    /// The domain-specific operation performed by the call.
    pub operation: Operation,
    /// The resource or entity the call targets (table name, URL, queue
    /// name), when one could be extracted.
    pub target: Option<String>,
    /// Whether the call happens in an asynchronous context.
    pub async_call: bool,
    /// The library or framework the call was matched against.
    pub framework: Option<String>,
}

impl OpKind {
    /// Creates a new classification from an operation.
    ///
    /// The domain is derived from the operation, so the two can never
    /// disagree.
    pub fn new(operation: Operation) -> Self {
        Self {
            domain: operation.domain(),
            operation,
            target: None,
            async_call: false,
            framework: None,
        }
    }

    /// Sets the target of the classification.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Marks the classification as asynchronous.
    pub fn with_async(mut self, async_call: bool) -> Self {
        self.async_call = async_call;
        self
    }

    /// Sets the framework of the classification.
    pub fn with_framework(mut self, framework: impl Into<String>) -> Self {
        self.framework = Some(framework.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_operations_within_their_domain() {
        assert_eq!(
            Operation::parse(Domain::Db, "retrieve_all"),
            Some(Operation::Db(DbOperation::RetrieveAll))
        );
        assert_eq!(
            Operation::parse(Domain::Cache, "ttl"),
            Some(Operation::Cache(CacheOperation::Ttl))
        );

        // `publish` is a queue operation, not a db operation.
        assert_eq!(Operation::parse(Domain::Db, "publish"), None);
    }

    #[test]
    fn it_derives_domains_from_operations() {
        let kind = OpKind::new(Operation::Http(HttpOperation::Post));
        assert_eq!(kind.domain, Domain::Http);
        assert_eq!(kind.operation.domain(), kind.domain);
        assert!(!kind.async_call);
    }

    #[test]
    fn it_displays_operations_in_snake_case() {
        assert_eq!(
            Operation::Auth(AuthOperation::VerifyToken).to_string(),
            "verify_token"
        );
        assert_eq!(Domain::ExternalApi.to_string(), "external_api");
    }
}
