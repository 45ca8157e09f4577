use std::collections::BTreeSet;

use crate::image::{Image, is_same_image};
use crate::service::Service;

/// Read-only answer to "can this service's image be used right now, and if
/// not, is it on the way".
#[derive(Debug, Clone, Copy)]
pub struct ImageInventory<'a> {
    images: &'a [Image],
    downloading: &'a BTreeSet<u32>,
}

impl<'a> ImageInventory<'a> {
    pub fn new(images: &'a [Image], downloading: &'a BTreeSet<u32>) -> Self {
        Self { images, downloading }
    }

    /// True when some image on disk satisfies the service, either by engine
    /// digest or by registry-name equivalence.
    pub fn is_available(&self, service: &Service) -> bool {
        self.images.iter().any(|image| {
            image
                .docker_image_id
                .as_deref()
                .is_some_and(|digest| digest == service.config.image)
                || is_same_image(&image.name, &service.config.image)
        })
    }

    pub fn is_downloading(&self, service: &Service) -> bool {
        self.downloading.contains(&service.image_id)
    }
}
