//! Label keys and well-known values stamped on topology-owned objects

/// Application name used as the value of [`LABEL_APP`]
pub const APP_NAME: &str = "netlab";

/// Identifies the application that manages the object
pub const LABEL_APP: &str = "netlab/app";

/// Rendered object name; also the name selector label
pub const LABEL_NAME: &str = "netlab/name";

/// Name of the owning topology
pub const LABEL_TOPOLOGY_OWNER: &str = "netlab/topologyOwner";

/// Name of the topology node the object belongs to
pub const LABEL_TOPOLOGY_NODE: &str = "netlab/topologyNode";

/// Definition kind of the owning topology (containerlab, kne)
pub const LABEL_TOPOLOGY_KIND: &str = "netlab/topologyKind";

/// Field manager name for writes issued by the controller
pub const FIELD_MANAGER: &str = "netlab-claims";

/// Storage request key in a claim's resource requests
pub const STORAGE_RESOURCE: &str = "storage";

/// Claim size used when the topology does not ask for one
pub const DEFAULT_CLAIM_SIZE: &str = "5Gi";
