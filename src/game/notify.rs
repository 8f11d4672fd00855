use bevy::prelude::*;
use rand::Rng;
use rand::seq::IndexedRandom;

use super::catalog::CatalogItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Info,
    Error,
}

/// Non-blocking notification shown in the corner overlay.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: String,
    pub description: Option<String>,
}

impl Toast {
    pub fn new(kind: ToastKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn insufficient_funds(cost: u32) -> Self {
        Self::new(ToastKind::Error, "Not enough coins!")
            .with_description(format!("You need {cost} gold coins."))
    }

    pub fn won<R: Rng + ?Sized>(item: &CatalogItem, rng: &mut R) -> Self {
        let toast = Self::new(ToastKind::Success, format!("You won: {}!", item.name));
        match item.phrases.choose(rng) {
            Some(phrase) => toast.with_description(phrase.clone()),
            None => toast,
        }
    }

    pub fn lost() -> Self {
        Self::new(ToastKind::Info, "Too bad!")
            .with_description("You didn't win anything this time. Try again!")
    }

    pub fn user_not_found() -> Self {
        Self::new(ToastKind::Error, "User not found")
    }

    pub fn welcome(username: &str) -> Self {
        Self::new(ToastKind::Success, format!("Welcome, {username}!"))
    }

    pub fn store_failure(what: &str, error: &str) -> Self {
        Self::new(ToastKind::Error, format!("Could not save {what}"))
            .with_description(error.to_string())
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::game::catalog::Catalog;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn won__picks_one_of_the_item_phrases() {
        let catalog = Catalog::with_defaults();
        let item = catalog.get("fanta-apito").unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let toast = Toast::won(item, &mut rng);

        assert_eq!(toast.title, "You won: Fanta Apito!");
        assert!(item.phrases.contains(&toast.description.unwrap()));
    }

    #[test]
    fn insufficient_funds__names_the_cost() {
        let toast = Toast::insufficient_funds(25);

        assert_eq!(toast.kind, ToastKind::Error);
        assert_eq!(toast.description.as_deref(), Some("You need 25 gold coins."));
    }
}
