//! Stateless word bank: per-category lists, random selection, and the
//! progressively revealed masked hint.

use rand::prelude::*;

const ANIMALS: &[&str] = &[
    "owl", "elephant", "giraffe", "penguin", "dolphin", "kangaroo", "octopus", "hedgehog",
    "flamingo", "squirrel", "walrus", "panther", "raccoon", "lobster", "peacock", "hamster",
    "chameleon", "jellyfish", "ostrich", "beaver", "toucan", "armadillo", "platypus", "moose",
];

const FOOD: &[&str] = &[
    "pizza", "ice cream", "spaghetti", "pancake", "hamburger", "croissant", "sushi", "taco",
    "pretzel", "waffle", "popcorn", "doughnut", "avocado", "pineapple", "cupcake", "sandwich",
    "hot dog", "lasagna", "omelette", "burrito", "meatball", "baguette", "watermelon", "cheese",
];

const OBJECTS: &[&str] = &[
    "anchor", "umbrella", "telescope", "lighthouse", "backpack", "scissors", "compass", "ladder",
    "hourglass", "typewriter", "accordion", "binoculars", "candle", "hammock", "kettle", "magnet",
    "paperclip", "snow globe", "stethoscope", "wheelbarrow", "zipper", "periscope", "anvil",
    "lantern",
];

const SPORTS: &[&str] = &[
    "basketball", "snowboard", "trampoline", "javelin", "surfboard", "bowling", "archery",
    "karate", "marathon", "volleyball", "skateboard", "badminton", "pole vault", "canoe",
    "hurdles", "dodgeball", "fencing", "curling", "gymnastics", "wrestling",
];

const NATURE: &[&str] = &[
    "volcano", "waterfall", "rainbow", "glacier", "tornado", "cactus", "island", "meteor",
    "coral reef", "avalanche", "geyser", "canyon", "lightning", "mushroom", "iceberg", "dune",
    "swamp", "comet", "aurora", "tide pool",
];

const CATEGORIES: &[(&str, &[&str])] = &[
    ("animals", ANIMALS),
    ("food", FOOD),
    ("objects", OBJECTS),
    ("sports", SPORTS),
    ("nature", NATURE),
];

/// Category keys offered to clients, `mixed` first
pub fn category_keys() -> Vec<&'static str> {
    let mut keys = vec!["mixed"];
    keys.extend(CATEGORIES.iter().map(|(key, _)| *key));
    keys
}

fn category_words(category: &str) -> Vec<&'static str> {
    if let Some((_, words)) = CATEGORIES.iter().find(|(key, _)| *key == category) {
        words.to_vec()
    } else {
        // "mixed" and anything unknown draw from the whole bank
        CATEGORIES.iter().flat_map(|(_, words)| *words).copied().collect()
    }
}

/// Pick `n` distinct random words from the given category
pub fn pick_words(category: &str, n: usize) -> Vec<String> {
    let pool = category_words(category);
    let mut rng = rand::rng();
    pool.choose_multiple(&mut rng, n)
        .map(|w| w.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
enum HintSlot {
    Letter { ch: char, revealed: bool },
    Space,
}

/// Masked representation of the secret word. Renders letters as `_` joined
/// by single spaces; word-internal spaces widen to a double space.
#[derive(Debug, Clone)]
pub struct WordHint {
    slots: Vec<HintSlot>,
}

impl WordHint {
    pub fn new(word: &str) -> Self {
        let slots = word
            .chars()
            .map(|ch| {
                if ch == ' ' {
                    HintSlot::Space
                } else {
                    HintSlot::Letter { ch, revealed: false }
                }
            })
            .collect();
        Self { slots }
    }

    pub fn render(&self) -> String {
        self.slots
            .iter()
            .map(|slot| match slot {
                HintSlot::Letter { revealed: false, .. } => "_".to_string(),
                HintSlot::Letter { ch, revealed: true } => ch.to_string(),
                HintSlot::Space => String::new(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn masked_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, HintSlot::Letter { revealed: false, .. }))
            .count()
    }

    /// Reveal one uniformly random still-masked letter. Returns false when
    /// nothing is left to reveal.
    pub fn reveal_random_letter(&mut self) -> bool {
        let masked: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| matches!(slot, HintSlot::Letter { revealed: false, .. }))
            .map(|(i, _)| i)
            .collect();
        let Some(&index) = masked.choose(&mut rand::rng()) else {
            return false;
        };
        if let HintSlot::Letter { revealed, .. } = &mut self.slots[index] {
            *revealed = true;
        }
        true
    }
}
