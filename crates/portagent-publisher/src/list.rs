use portagent_packet::Packet;
use tracing::warn;

use crate::traits::Publisher;

/// Ordered fan-out to several publishers.
///
/// Every publisher sees every packet, even after an earlier one failed.
#[derive(Default)]
pub struct PublisherList {
    publishers: Vec<Box<dyn Publisher + Send>>,
}

impl PublisherList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, publisher: impl Publisher + Send + 'static) {
        self.publishers.push(Box::new(publisher));
    }

    pub fn len(&self) -> usize {
        self.publishers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }

    /// Hand `packet` to every publisher. True only if all of them succeeded.
    pub fn handle(&mut self, packet: &Packet) -> bool {
        let mut all = true;
        for publisher in &mut self.publishers {
            if !publisher.handle(packet) {
                warn!(publisher = publisher.name(), "publisher rejected packet");
                all = false;
            }
        }
        all
    }
}

impl std::fmt::Debug for PublisherList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.publishers.iter().map(|p| p.name()))
            .finish()
    }
}
