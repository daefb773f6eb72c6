//! The semantic pattern registry and enrichment pass.

use indexmap::IndexMap;
use metastatic_ast::AuthOperation;
use metastatic_ast::CacheOperation;
use metastatic_ast::DbOperation;
use metastatic_ast::Document;
use metastatic_ast::Domain;
use metastatic_ast::ExternalApiOperation;
use metastatic_ast::FileOperation;
use metastatic_ast::HttpOperation;
use metastatic_ast::Language;
use metastatic_ast::LiteralKind;
use metastatic_ast::LoopForm;
use metastatic_ast::MetaNode;
use metastatic_ast::OpKind;
use metastatic_ast::Operation;
use metastatic_ast::QueueOperation;
use parking_lot::RwLock;

/// Matches a function-call name.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// The whole name, verbatim.
    Exact(String),
    /// A `*.`-style wildcard: the name itself, or any name ending with
    /// `.suffix`.
    Suffix(String),
    /// An arbitrary regular expression over the whole name.
    Regex(regex::Regex),
}

impl Matcher {
    /// Builds a matcher from a literal pattern; a leading `*.` matches any
    /// receiver.
    pub fn literal(pattern: &str) -> Matcher {
        match pattern.strip_prefix("*.") {
            Some(suffix) => Matcher::Suffix(suffix.to_string()),
            None => Matcher::Exact(pattern.to_string()),
        }
    }

    /// Determines whether the matcher accepts a call name.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(exact) => name == exact,
            Self::Suffix(suffix) => {
                name == suffix
                    || (name.len() > suffix.len()
                        && name.ends_with(suffix)
                        && name.as_bytes()[name.len() - suffix.len() - 1] == b'.')
            }
            Self::Regex(regex) => regex.is_match(name),
        }
    }
}

/// How the target resource is extracted from a matched call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetRule {
    /// No target.
    #[default]
    None,
    /// The textual form of the first argument, when it is a string,
    /// symbol, or variable.
    FirstArg,
    /// The receiver portion of the dotted call name.
    Receiver,
}

/// What a matched pattern says about a call.
#[derive(Debug, Clone)]
pub struct PatternSpec {
    /// The operation the call performs.
    pub operation: Operation,
    /// The framework the pattern belongs to.
    pub framework: Option<String>,
    /// How to extract the call's target resource.
    pub extract_target: TargetRule,
}

impl PatternSpec {
    /// Creates a spec for an operation.
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            framework: None,
            extract_target: TargetRule::None,
        }
    }

    /// Sets the framework, builder style.
    pub fn framework(mut self, framework: impl Into<String>) -> Self {
        self.framework = Some(framework.into());
        self
    }

    /// Sets the target-extraction rule, builder style.
    pub fn target(mut self, rule: TargetRule) -> Self {
        self.extract_target = rule;
        self
    }
}

/// One registered pattern with its global registration order.
#[derive(Debug, Clone)]
struct Entry {
    /// The global registration sequence number.
    seq: u64,
    /// The name matcher.
    matcher: Matcher,
    /// The matched spec.
    spec: PatternSpec,
}

/// The lock-guarded registry state.
#[derive(Debug, Default)]
struct Inner {
    /// Patterns keyed by domain and language.
    patterns: IndexMap<(Domain, Language), Vec<Entry>>,
    /// The next registration sequence number.
    next_seq: u64,
}

/// The semantic pattern registry.
///
/// Patterns are keyed by `(domain, language)`; matching considers every
/// domain for the document's language and picks the earliest-registered
/// match. Later registrations never shadow earlier ones unless the earlier
/// ones are explicitly unregistered.
#[derive(Debug, Default)]
pub struct SemanticRegistry {
    /// The lock-guarded registry state.
    inner: RwLock<Inner>,
}

impl SemanticRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pattern for a domain and language.
    pub fn register(
        &self,
        domain: Domain,
        language: Language,
        matcher: Matcher,
        spec: PatternSpec,
    ) {
        debug_assert_eq!(spec.operation.domain(), domain);

        let mut inner = self.inner.write();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .patterns
            .entry((domain, language))
            .or_default()
            .push(Entry { seq, matcher, spec });
    }

    /// Removes every pattern registered for a domain and language.
    pub fn unregister(&self, domain: Domain, language: Language) {
        self.inner.write().patterns.shift_remove(&(domain, language));
    }

    /// Counts the patterns registered for a domain and language.
    pub fn pattern_count(&self, domain: Domain, language: Language) -> usize {
        self.inner
            .read()
            .patterns
            .get(&(domain, language))
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Finds the earliest-registered pattern matching a call name in any
    /// domain for the given language.
    pub fn lookup(&self, language: Language, name: &str) -> Option<(Domain, PatternSpec)> {
        let inner = self.inner.read();
        let mut best: Option<(u64, Domain, PatternSpec)> = None;

        for ((domain, lang), entries) in &inner.patterns {
            if *lang != language {
                continue;
            }

            for entry in entries {
                if entry.matcher.matches(name)
                    && best.as_ref().is_none_or(|(seq, ..)| entry.seq < *seq)
                {
                    best = Some((entry.seq, *domain, entry.spec.clone()));
                }
            }
        }

        best.map(|(_, domain, spec)| (domain, spec))
    }

    /// Creates a registry seeded with the built-in per-language tables.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        seed_defaults(&registry);
        registry
    }
}

/// Enriches a document, attaching an [`OpKind`] to every matched call.
///
/// Produces a new document; the input is untouched. The async flag is set
/// for calls lexically inside an asynchronous operation.
pub fn enrich(document: &Document, registry: &SemanticRegistry) -> Document {
    let mut enriched = document.clone();
    enrich_node(&mut enriched.ast, registry, document.language, false);
    enriched
}

/// Recursively enriches one node.
fn enrich_node(
    node: &mut MetaNode,
    registry: &SemanticRegistry,
    language: Language,
    in_async: bool,
) {
    let classification = match &*node {
        MetaNode::FunctionCall { name, args, .. } => {
            registry.lookup(language, name).map(|(domain, spec)| {
                let target = match spec.extract_target {
                    TargetRule::None => None,
                    TargetRule::FirstArg => args.first().and_then(textual_form),
                    TargetRule::Receiver => name
                        .rsplit_once('.')
                        .map(|(receiver, _)| receiver.to_string()),
                };

                let mut op_kind = OpKind::new(spec.operation).with_async(in_async);
                op_kind.target = target;
                op_kind.framework = spec.framework;
                debug_assert_eq!(op_kind.domain, domain);

                tracing::trace!(call = %name, operation = %op_kind.operation, "classified call");
                op_kind
            })
        }
        _ => None,
    };
    if let Some(op_kind) = classification {
        node.metadata_mut().set_op_kind(op_kind);
    }

    let in_async = in_async || matches!(node, MetaNode::AsyncOperation { .. });

    match node {
        MetaNode::BinaryOp { lhs, rhs, .. } => {
            enrich_node(lhs, registry, language, in_async);
            enrich_node(rhs, registry, language, in_async);
        }
        MetaNode::UnaryOp { operand, .. } => enrich_node(operand, registry, language, in_async),
        MetaNode::FunctionCall { args, .. } => {
            for arg in args {
                enrich_node(arg, registry, language, in_async);
            }
        }
        MetaNode::Conditional {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            enrich_node(condition, registry, language, in_async);
            enrich_node(then_branch, registry, language, in_async);
            if let Some(else_branch) = else_branch {
                enrich_node(else_branch, registry, language, in_async);
            }
        }
        MetaNode::Block { statements, .. } => {
            for statement in statements {
                enrich_node(statement, registry, language, in_async);
            }
        }
        MetaNode::Assignment { target, value, .. } => {
            enrich_node(target, registry, language, in_async);
            enrich_node(value, registry, language, in_async);
        }
        MetaNode::Loop { form, .. } => match form {
            LoopForm::While { condition, body } => {
                enrich_node(condition, registry, language, in_async);
                enrich_node(body, registry, language, in_async);
            }
            LoopForm::For {
                init,
                condition,
                step,
                body,
            } => {
                enrich_node(init, registry, language, in_async);
                enrich_node(condition, registry, language, in_async);
                enrich_node(step, registry, language, in_async);
                enrich_node(body, registry, language, in_async);
            }
            LoopForm::ForEach {
                binding,
                iterable,
                body,
            } => {
                enrich_node(binding, registry, language, in_async);
                enrich_node(iterable, registry, language, in_async);
                enrich_node(body, registry, language, in_async);
            }
        },
        MetaNode::Lambda { params, body, .. } => {
            for param in params {
                enrich_node(param, registry, language, in_async);
            }
            enrich_node(body, registry, language, in_async);
        }
        MetaNode::CollectionOp {
            func,
            collection,
            init,
            ..
        } => {
            enrich_node(func, registry, language, in_async);
            enrich_node(collection, registry, language, in_async);
            if let Some(init) = init {
                enrich_node(init, registry, language, in_async);
            }
        }
        MetaNode::PatternMatch {
            scrutinee, arms, ..
        } => {
            enrich_node(scrutinee, registry, language, in_async);
            for arm in arms {
                enrich_node(&mut arm.pattern, registry, language, in_async);
                if let Some(guard) = &mut arm.guard {
                    enrich_node(guard, registry, language, in_async);
                }
                enrich_node(&mut arm.body, registry, language, in_async);
            }
        }
        MetaNode::ExceptionHandling {
            body,
            catches,
            else_body,
            ..
        } => {
            enrich_node(body, registry, language, in_async);
            for clause in catches {
                if let Some(pattern) = &mut clause.pattern {
                    enrich_node(pattern, registry, language, in_async);
                }
                enrich_node(&mut clause.body, registry, language, in_async);
            }
            if let Some(else_body) = else_body {
                enrich_node(else_body, registry, language, in_async);
            }
        }
        MetaNode::AsyncOperation { body, .. } => {
            enrich_node(body, registry, language, in_async);
        }
        MetaNode::List { items, .. } | MetaNode::Tuple { items, .. } => {
            for item in items {
                enrich_node(item, registry, language, in_async);
            }
        }
        MetaNode::MapLiteral { entries, .. } => {
            for (key, value) in entries {
                enrich_node(key, registry, language, in_async);
                enrich_node(value, registry, language, in_async);
            }
        }
        MetaNode::Pair { first, second, .. } => {
            enrich_node(first, registry, language, in_async);
            enrich_node(second, registry, language, in_async);
        }
        MetaNode::EarlyReturn { value, .. } => {
            if let Some(value) = value {
                enrich_node(value, registry, language, in_async);
            }
        }
        MetaNode::InlineMatch { pattern, value, .. } => {
            enrich_node(pattern, registry, language, in_async);
            enrich_node(value, registry, language, in_async);
        }
        MetaNode::Literal { .. }
        | MetaNode::Variable { .. }
        | MetaNode::Wildcard { .. }
        | MetaNode::LanguageSpecific { .. } => {}
    }
}

/// Gets the textual form of a string or symbol literal or variable.
fn textual_form(node: &MetaNode) -> Option<String> {
    match node {
        MetaNode::Literal { subtype, value, .. }
            if matches!(subtype, LiteralKind::String | LiteralKind::Symbol) =>
        {
            Some(value.as_text())
        }
        MetaNode::Variable { name, .. } => Some(name.clone()),
        _ => None,
    }
}

/// Seeds the built-in pattern tables.
fn seed_defaults(registry: &SemanticRegistry) {
    use Language::*;

    /// Registers one literal pattern.
    fn add(
        registry: &SemanticRegistry,
        language: Language,
        pattern: &str,
        operation: Operation,
        framework: &str,
        target: TargetRule,
    ) {
        registry.register(
            operation.domain(),
            language,
            Matcher::literal(pattern),
            PatternSpec::new(operation).framework(framework).target(target),
        );
    }

    // Database access.
    for (pattern, op) in [
        ("*.Repo.get", Operation::Db(DbOperation::Retrieve)),
        ("*.Repo.get_by", Operation::Db(DbOperation::Retrieve)),
        ("*.Repo.all", Operation::Db(DbOperation::RetrieveAll)),
        ("*.Repo.insert", Operation::Db(DbOperation::Create)),
        ("*.Repo.update", Operation::Db(DbOperation::Update)),
        ("*.Repo.delete", Operation::Db(DbOperation::Delete)),
        ("*.Repo.transaction", Operation::Db(DbOperation::Transaction)),
        ("*.Repo.preload", Operation::Db(DbOperation::Preload)),
        ("*.Repo.aggregate", Operation::Db(DbOperation::Aggregate)),
    ] {
        add(registry, Elixir, pattern, op, "ecto", TargetRule::FirstArg);
    }

    for (pattern, op) in [
        ("*.find", Operation::Db(DbOperation::Retrieve)),
        ("*.find_by", Operation::Db(DbOperation::Retrieve)),
        ("*.where", Operation::Db(DbOperation::Query)),
        ("*.create", Operation::Db(DbOperation::Create)),
        ("*.update", Operation::Db(DbOperation::Update)),
        ("*.destroy", Operation::Db(DbOperation::Delete)),
    ] {
        add(registry, Ruby, pattern, op, "activerecord", TargetRule::Receiver);
    }

    for (pattern, op) in [
        ("*.objects.get", Operation::Db(DbOperation::Retrieve)),
        ("*.objects.all", Operation::Db(DbOperation::RetrieveAll)),
        ("*.objects.filter", Operation::Db(DbOperation::Query)),
        ("*.objects.create", Operation::Db(DbOperation::Create)),
        ("*.save", Operation::Db(DbOperation::Update)),
    ] {
        add(registry, Python, pattern, op, "django", TargetRule::Receiver);
    }
    add(
        registry,
        Python,
        "*.execute",
        Operation::Db(DbOperation::Query),
        "dbapi",
        TargetRule::FirstArg,
    );
    add(
        registry,
        Erlang,
        "mnesia.read",
        Operation::Db(DbOperation::Retrieve),
        "mnesia",
        TargetRule::FirstArg,
    );
    add(
        registry,
        Erlang,
        "mnesia.write",
        Operation::Db(DbOperation::Create),
        "mnesia",
        TargetRule::FirstArg,
    );
    add(
        registry,
        Erlang,
        "mnesia.transaction",
        Operation::Db(DbOperation::Transaction),
        "mnesia",
        TargetRule::None,
    );
    add(
        registry,
        Haskell,
        "selectList",
        Operation::Db(DbOperation::RetrieveAll),
        "persistent",
        TargetRule::None,
    );

    // HTTP traffic.
    for (language, prefix, framework) in [
        (Python, "requests", "requests"),
        (Elixir, "HTTPoison", "httpoison"),
        (Elixir, "Req", "req"),
        (Ruby, "HTTParty", "httparty"),
        (Ruby, "Faraday", "faraday"),
        (Erlang, "hackney", "hackney"),
    ] {
        for (verb, op) in [
            ("get", Operation::Http(HttpOperation::Get)),
            ("post", Operation::Http(HttpOperation::Post)),
            ("put", Operation::Http(HttpOperation::Put)),
            ("patch", Operation::Http(HttpOperation::Patch)),
            ("delete", Operation::Http(HttpOperation::Delete)),
            ("head", Operation::Http(HttpOperation::Head)),
            ("options", Operation::Http(HttpOperation::Options)),
            ("request", Operation::Http(HttpOperation::Request)),
        ] {
            add(
                registry,
                language,
                &format!("{prefix}.{verb}"),
                op,
                framework,
                TargetRule::FirstArg,
            );
        }
    }
    add(
        registry,
        Erlang,
        "httpc.request",
        Operation::Http(HttpOperation::Request),
        "inets",
        TargetRule::FirstArg,
    );
    add(
        registry,
        Haskell,
        "httpLBS",
        Operation::Http(HttpOperation::Request),
        "http-conduit",
        TargetRule::FirstArg,
    );

    // Authentication.
    add(
        registry,
        Elixir,
        "Bcrypt.hash_pwd_salt",
        Operation::Auth(AuthOperation::HashPassword),
        "bcrypt_elixir",
        TargetRule::None,
    );
    add(
        registry,
        Elixir,
        "Bcrypt.verify_pass",
        Operation::Auth(AuthOperation::VerifyPassword),
        "bcrypt_elixir",
        TargetRule::None,
    );
    add(
        registry,
        Python,
        "bcrypt.hashpw",
        Operation::Auth(AuthOperation::HashPassword),
        "bcrypt",
        TargetRule::None,
    );
    add(
        registry,
        Python,
        "jwt.encode",
        Operation::Auth(AuthOperation::GenerateToken),
        "pyjwt",
        TargetRule::None,
    );
    add(
        registry,
        Python,
        "jwt.decode",
        Operation::Auth(AuthOperation::VerifyToken),
        "pyjwt",
        TargetRule::None,
    );
    add(
        registry,
        Ruby,
        "*.authenticate",
        Operation::Auth(AuthOperation::Authenticate),
        "devise",
        TargetRule::Receiver,
    );

    // Cache access.
    for (pattern, op) in [
        ("Cachex.get", Operation::Cache(CacheOperation::Get)),
        ("Cachex.put", Operation::Cache(CacheOperation::Set)),
        ("Cachex.del", Operation::Cache(CacheOperation::Delete)),
        ("Cachex.clear", Operation::Cache(CacheOperation::Clear)),
        ("Cachex.expire", Operation::Cache(CacheOperation::Expire)),
        ("Cachex.fetch", Operation::Cache(CacheOperation::Fetch)),
    ] {
        add(registry, Elixir, pattern, op, "cachex", TargetRule::FirstArg);
    }
    for (pattern, op) in [
        ("cache.get", Operation::Cache(CacheOperation::Get)),
        ("cache.set", Operation::Cache(CacheOperation::Set)),
        ("cache.delete", Operation::Cache(CacheOperation::Delete)),
        ("cache.clear", Operation::Cache(CacheOperation::Clear)),
        ("cache.incr", Operation::Cache(CacheOperation::Increment)),
        ("cache.decr", Operation::Cache(CacheOperation::Decrement)),
        ("cache.ttl", Operation::Cache(CacheOperation::Ttl)),
    ] {
        add(registry, Python, pattern, op, "django-cache", TargetRule::FirstArg);
    }
    for (pattern, op) in [
        ("Rails.cache.read", Operation::Cache(CacheOperation::Get)),
        ("Rails.cache.write", Operation::Cache(CacheOperation::Set)),
        ("Rails.cache.delete", Operation::Cache(CacheOperation::Delete)),
        ("Rails.cache.fetch", Operation::Cache(CacheOperation::Fetch)),
        ("Rails.cache.exist?", Operation::Cache(CacheOperation::Exists)),
    ] {
        add(registry, Ruby, pattern, op, "rails", TargetRule::FirstArg);
    }
    for (pattern, op) in [
        ("ets.lookup", Operation::Cache(CacheOperation::Get)),
        ("ets.insert", Operation::Cache(CacheOperation::Set)),
        ("ets.delete", Operation::Cache(CacheOperation::Delete)),
    ] {
        add(registry, Erlang, pattern, op, "ets", TargetRule::FirstArg);
    }

    // Message queues.
    add(
        registry,
        Elixir,
        "Oban.insert",
        Operation::Queue(QueueOperation::Enqueue),
        "oban",
        TargetRule::None,
    );
    add(
        registry,
        Elixir,
        "*.Basic.publish",
        Operation::Queue(QueueOperation::Publish),
        "amqp",
        TargetRule::None,
    );
    add(
        registry,
        Python,
        "*.delay",
        Operation::Queue(QueueOperation::Enqueue),
        "celery",
        TargetRule::Receiver,
    );
    add(
        registry,
        Python,
        "*.apply_async",
        Operation::Queue(QueueOperation::Schedule),
        "celery",
        TargetRule::Receiver,
    );
    add(
        registry,
        Ruby,
        "*.perform_async",
        Operation::Queue(QueueOperation::Enqueue),
        "sidekiq",
        TargetRule::Receiver,
    );
    add(
        registry,
        Ruby,
        "*.perform_later",
        Operation::Queue(QueueOperation::Schedule),
        "activejob",
        TargetRule::Receiver,
    );
    add(
        registry,
        Erlang,
        "amqp_channel.cast",
        Operation::Queue(QueueOperation::Publish),
        "amqp_client",
        TargetRule::None,
    );

    // File system access.
    for (pattern, op) in [
        ("open", Operation::File(FileOperation::Open)),
        ("os.remove", Operation::File(FileOperation::Delete)),
        ("os.mkdir", Operation::File(FileOperation::Mkdir)),
        ("os.rmdir", Operation::File(FileOperation::Rmdir)),
        ("os.listdir", Operation::File(FileOperation::List)),
        ("os.path.exists", Operation::File(FileOperation::Exists)),
        ("os.stat", Operation::File(FileOperation::Stat)),
        ("shutil.copy", Operation::File(FileOperation::Copy)),
        ("shutil.move", Operation::File(FileOperation::Move)),
    ] {
        add(registry, Python, pattern, op, "stdlib", TargetRule::FirstArg);
    }
    for (pattern, op) in [
        ("File.read", Operation::File(FileOperation::Read)),
        ("File.write", Operation::File(FileOperation::Write)),
        ("File.rm", Operation::File(FileOperation::Delete)),
        ("File.mkdir", Operation::File(FileOperation::Mkdir)),
        ("File.exists?", Operation::File(FileOperation::Exists)),
        ("File.stat", Operation::File(FileOperation::Stat)),
        ("File.ls", Operation::File(FileOperation::List)),
        ("File.open", Operation::File(FileOperation::Open)),
        ("File.close", Operation::File(FileOperation::Close)),
    ] {
        add(registry, Elixir, pattern, op, "stdlib", TargetRule::FirstArg);
    }
    for (pattern, op) in [
        ("File.read", Operation::File(FileOperation::Read)),
        ("File.write", Operation::File(FileOperation::Write)),
        ("File.delete", Operation::File(FileOperation::Delete)),
        ("File.exist?", Operation::File(FileOperation::Exists)),
        ("Dir.mkdir", Operation::File(FileOperation::Mkdir)),
        ("Dir.entries", Operation::File(FileOperation::List)),
    ] {
        add(registry, Ruby, pattern, op, "stdlib", TargetRule::FirstArg);
    }
    for (pattern, op) in [
        ("file.read_file", Operation::File(FileOperation::Read)),
        ("file.write_file", Operation::File(FileOperation::Write)),
        ("file.delete", Operation::File(FileOperation::Delete)),
        ("file.make_dir", Operation::File(FileOperation::Mkdir)),
        ("file.list_dir", Operation::File(FileOperation::List)),
    ] {
        add(registry, Erlang, pattern, op, "stdlib", TargetRule::FirstArg);
    }
    for (pattern, op) in [
        ("readFile", Operation::File(FileOperation::Read)),
        ("writeFile", Operation::File(FileOperation::Write)),
        ("appendFile", Operation::File(FileOperation::Append)),
        ("removeFile", Operation::File(FileOperation::Delete)),
        ("createDirectory", Operation::File(FileOperation::Mkdir)),
        ("listDirectory", Operation::File(FileOperation::List)),
    ] {
        add(registry, Haskell, pattern, op, "stdlib", TargetRule::FirstArg);
    }

    // Third-party services.
    add(
        registry,
        Python,
        "stripe.Charge.create",
        Operation::ExternalApi(ExternalApiOperation::Charge),
        "stripe",
        TargetRule::None,
    );
    add(
        registry,
        Elixir,
        "Stripe.Charge.create",
        Operation::ExternalApi(ExternalApiOperation::Charge),
        "stripity_stripe",
        TargetRule::None,
    );
    add(
        registry,
        Python,
        "boto3.client",
        Operation::ExternalApi(ExternalApiOperation::Call),
        "boto3",
        TargetRule::FirstArg,
    );
    add(
        registry,
        Ruby,
        "*.upload_file",
        Operation::ExternalApi(ExternalApiOperation::Upload),
        "aws-sdk",
        TargetRule::FirstArg,
    );
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn wildcard_matchers_accept_any_receiver() {
        let matcher = Matcher::literal("*.Repo.get");
        assert!(matcher.matches("Repo.get"));
        assert!(matcher.matches("MyApp.Repo.get"));
        assert!(!matcher.matches("MyAppRepo.get"));
        assert!(!matcher.matches("Repo.get_by"));
    }

    #[test]
    fn earliest_registration_wins() {
        let registry = SemanticRegistry::new();
        registry.register(
            Domain::Cache,
            Language::Python,
            Matcher::literal("store.get"),
            PatternSpec::new(Operation::Cache(CacheOperation::Get)).framework("first"),
        );
        registry.register(
            Domain::Http,
            Language::Python,
            Matcher::literal("store.get"),
            PatternSpec::new(Operation::Http(HttpOperation::Get)).framework("second"),
        );

        let (domain, spec) = registry.lookup(Language::Python, "store.get").unwrap();
        assert_eq!(domain, Domain::Cache);
        assert_eq!(spec.framework.as_deref(), Some("first"));
    }

    #[test]
    fn enrichment_attaches_op_kinds() {
        let registry = SemanticRegistry::with_defaults();
        let ast = MetaNode::call(
            "MyApp.Repo.get",
            vec![MetaNode::variable("user_id")],
        );
        let document = Document::new(ast, Language::Elixir);

        let enriched = enrich(&document, &registry);
        let op_kind = enriched.ast.metadata().op_kind().expect("classified");
        assert_eq!(op_kind.domain, Domain::Db);
        assert_eq!(op_kind.operation, Operation::Db(DbOperation::Retrieve));
        assert_eq!(op_kind.target.as_deref(), Some("user_id"));
        assert!(!op_kind.async_call);

        // The input document is untouched.
        assert!(document.ast.metadata().op_kind().is_none());
    }

    #[test]
    fn async_context_sets_the_flag() {
        let registry = SemanticRegistry::with_defaults();
        let ast = MetaNode::AsyncOperation {
            meta: Default::default(),
            kind: metastatic_ast::AsyncKind::Async,
            body: Box::new(MetaNode::call(
                "requests.get",
                vec![MetaNode::string("https://example.com")],
            )),
        };
        let document = Document::new(ast, Language::Python);

        let enriched = enrich(&document, &registry);
        let MetaNode::AsyncOperation { body, .. } = &enriched.ast else {
            panic!("expected an async operation");
        };
        let op_kind = body.metadata().op_kind().expect("classified");
        assert!(op_kind.async_call);
        assert_eq!(op_kind.target.as_deref(), Some("https://example.com"));
    }
}
