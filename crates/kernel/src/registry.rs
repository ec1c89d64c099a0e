use crate::endpoint::{Endpoint, EndpointDescriptor, EndpointKind, Tag};

/// Catalogue of every endpoint the client knows about.
pub struct EndpointRegistry {
    queries: Vec<EndpointDescriptor>,
    mutations: Vec<EndpointDescriptor>,
}

impl EndpointRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            queries: Vec::new(),
            mutations: Vec::new(),
        }
    }

    /// Register an endpoint under its descriptor name
    pub fn register<E: Endpoint>(&mut self) {
        self.register_descriptor(E::DESCRIPTOR);
    }

    pub fn register_descriptor(&mut self, descriptor: EndpointDescriptor) {
        if self.get(descriptor.name).is_some() {
            tracing::warn!(endpoint = descriptor.name, "endpoint registered twice; keeping first");
            return;
        }

        match descriptor.kind {
            EndpointKind::Query => self.queries.push(descriptor),
            EndpointKind::Mutation => self.mutations.push(descriptor),
        }
    }

    /// All endpoints, queries first, each group sorted by name
    pub fn descriptors(&self) -> Vec<&EndpointDescriptor> {
        let mut queries: Vec<_> = self.queries.iter().collect();
        let mut mutations: Vec<_> = self.mutations.iter().collect();
        queries.sort_by_key(|d| d.name);
        mutations.sort_by_key(|d| d.name);

        queries.into_iter().chain(mutations).collect()
    }

    /// Look up an endpoint by name (searches queries, then mutations)
    pub fn get(&self, name: &str) -> Option<&EndpointDescriptor> {
        self.queries
            .iter()
            .find(|d| d.name == name)
            .or_else(|| self.mutations.iter().find(|d| d.name == name))
    }

    pub fn query_count(&self) -> usize {
        self.queries.len()
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.len()
    }

    /// Queries whose cached results carry `tag`
    pub fn providers_of(&self, tag: Tag) -> Vec<&EndpointDescriptor> {
        self.queries
            .iter()
            .filter(|d| d.provides.contains(&tag))
            .collect()
    }

    /// Mutations that mark `tag` stale when they complete
    pub fn invalidators_of(&self, tag: Tag) -> Vec<&EndpointDescriptor> {
        self.mutations
            .iter()
            .filter(|d| d.invalidates.contains(&tag))
            .collect()
    }

    /// Report tag relationships that leave cached data stale or are dead weight.
    pub fn audit(&self) -> Vec<String> {
        let mut findings = Vec::new();

        for mutation in &self.mutations {
            if mutation.invalidates.is_empty() {
                findings.push(format!(
                    "mutation '{}' ({} {}) invalidates no tags; cached queries will not see its effect",
                    mutation.name, mutation.method, mutation.path
                ));
            }

            for tag in mutation.invalidates {
                if self.providers_of(*tag).is_empty() {
                    findings.push(format!(
                        "mutation '{}' invalidates tag '{}' that no query provides",
                        mutation.name, tag
                    ));
                }
            }
        }

        for query in &self.queries {
            if !query.invalidates.is_empty() {
                findings.push(format!(
                    "query '{}' declares invalidated tags; only mutations invalidate",
                    query.name
                ));
            }
        }

        findings.sort();
        findings
    }
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}
