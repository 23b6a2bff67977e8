use std::collections::HashMap;

use crate::core::models::ClientRegistration;
use crate::core::types::ClientId;

#[derive(Debug, thiserror::Error)]
#[error("client_id {0:?} is registered more than once")]
pub struct DuplicateClient(pub ClientId);

/// Public client id to confidential registration, fixed at startup.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, ClientRegistration>,
}

impl ClientRegistry {
    pub fn from_registrations(
        registrations: impl IntoIterator<Item = ClientRegistration>,
    ) -> Result<Self, DuplicateClient> {
        let mut clients = HashMap::new();
        for registration in registrations {
            let id = registration.client_id.clone();
            if clients.insert(id.clone(), registration).is_some() {
                return Err(DuplicateClient(id));
            }
        }
        Ok(Self { clients })
    }

    pub fn get(&self, client_id: &ClientId) -> Option<&ClientRegistration> {
        self.clients.get(client_id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ClientSecret, UpstreamSlug};

    fn registration(id: &str, secret: &str) -> ClientRegistration {
        ClientRegistration {
            client_id: ClientId(id.to_string()),
            client_secret: ClientSecret(secret.to_string()),
            slug: UpstreamSlug(format!("{}-app", id)),
        }
    }

    #[test]
    fn looks_up_registered_clients() {
        let registry = ClientRegistry::from_registrations(vec![
            registration("cid1", "secret1"),
            registration("cid2", "secret2"),
        ])
        .unwrap();

        let found = registry.get(&ClientId("cid2".to_string())).unwrap();
        assert_eq!(found.client_secret.as_ref(), "secret2");
        assert_eq!(found.slug, UpstreamSlug("cid2-app".to_string()));
        assert!(registry.get(&ClientId("cid3".to_string())).is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn rejects_duplicate_client_ids() {
        let err = ClientRegistry::from_registrations(vec![
            registration("cid1", "a"),
            registration("cid1", "b"),
        ])
        .unwrap_err();

        assert_eq!(err.0, ClientId("cid1".to_string()));
    }
}
