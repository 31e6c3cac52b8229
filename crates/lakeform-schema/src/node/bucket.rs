use crate::{prelude::*, validate::naming::validate_resource_id};
use std::any::Any;
use tracing::warn;

///
/// BucketProps
///
/// Caller intent for a bucket. Public access and plain-text transport can be
/// requested here, but the declared `Bucket` never honours them.
///

#[derive(Clone, Debug, Default)]
pub struct BucketProps {
    pub encryption: BucketEncryption,
    pub public_read_access: bool,
    pub enforce_ssl: Option<bool>,
    pub versioned: bool,
}

///
/// Bucket
///
/// Object storage. Fields are private: the only way to obtain a `Bucket` is
/// `Bucket::new`, which pins the security baseline.
///

#[derive(Clone, Debug, Serialize)]
pub struct Bucket {
    id: String,
    block_public_access: bool,
    public_read_access: bool,
    encryption: BucketEncryption,
    enforce_ssl: bool,
    versioned: bool,
}

impl Bucket {
    pub fn new(id: &str, props: &BucketProps) -> Result<Self, ConstructionError> {
        validate_resource_id(id)?;

        if props.public_read_access {
            warn!(bucket = id, "public read access requested; overriding to private");
        }
        if props.enforce_ssl == Some(false) {
            warn!(bucket = id, "insecure transport requested; overriding to enforce ssl");
        }

        Ok(Self {
            id: id.to_string(),
            block_public_access: true,
            public_read_access: false,
            encryption: props.encryption,
            enforce_ssl: true,
            versioned: props.versioned,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn encryption(&self) -> BucketEncryption {
        self.encryption
    }

    #[must_use]
    pub const fn public_read_access(&self) -> bool {
        self.public_read_access
    }

    #[must_use]
    pub const fn blocks_public_access(&self) -> bool {
        self.block_public_access
    }

    #[must_use]
    pub const fn enforces_ssl(&self) -> bool {
        self.enforce_ssl
    }

    #[must_use]
    pub const fn versioned(&self) -> bool {
        self.versioned
    }

    /// True when the baseline (private, encrypted, TLS-only) holds.
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        self.block_public_access && !self.public_read_access && self.enforce_ssl
    }
}

impl ResourceNode for Bucket {
    fn kind() -> ResourceKind {
        ResourceKind::Bucket
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ValidateNode for Bucket {
    fn validate(&self, _: &Topology) -> Result<(), ErrorTree> {
        let mut errs = ErrorTree::new();

        if !self.is_secure() {
            err!(errs, "bucket '{}' violates the security baseline", self.id);
        }

        errs.result()
    }
}

impl VisitableNode for Bucket {
    fn route_key(&self) -> String {
        self.id.clone()
    }
}
