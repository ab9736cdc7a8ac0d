//! Built-in expense taxonomy, synchronized into the store on every start.
//!
//! Names and emojis may be edited freely. Immutable keys must never be changed or reused:
//! they are how existing records are found again.

use crate::models::category::{
    CategoryDefinition, CategoryType, CategoryType::*, SubcategoryDefinition,
};

fn sub(name: &str, key: &str, emojis: &[&str], category_type: CategoryType) -> SubcategoryDefinition {
    SubcategoryDefinition::new(name, key, emojis, category_type)
}

fn leaf(name: &str, key: &str, emojis: &[&str], category_type: CategoryType) -> CategoryDefinition {
    CategoryDefinition::new(name, key, emojis, category_type, vec![])
}

/// Returns the default category definitions in display order
pub fn default_taxonomy() -> Vec<CategoryDefinition> {
    vec![
        leaf(
            "Computers, smartphones and electronic devices",
            "1dc0abadd6f2356c6914",
            &["💻", "📱"],
            Expense,
        ),
        leaf(
            "Mobile phone cost (calls and internet cost, not devices)",
            "12ad85ba7fc3558e2ba6",
            &["📞"],
            Expense,
        ),
        leaf(
            "Applications, software and subscriptions to online services",
            "24e8a627aabdd4370447",
            &["🌎"],
            Expense,
        ),
        leaf("Presents, gifts", "c5bf0c86462c81bbf19d", &["🎁"], Expense),
        leaf(
            "Medicines and health care services",
            "9026b3ddcbc54ce40d06",
            &["💊"],
            Expense,
        ),
        leaf("Clothes and shoes", "5994fff85b0d42de2275", &["👕", "👟"], Expense),
        leaf("Public transport", "c54d86b43ff86c7af807", &["🚇", "🚌"], Expense),
        CategoryDefinition::new(
            "Private vehicles",
            "15cd0a1ee1d250239b19",
            &["🚙"],
            Expense,
            vec![
                sub("Vehicle taxes, technical inspection", "2c0f7ea86b62582c2308", &["🧾"], Expense),
                sub("Vehicle insurance", "55ba8bddc746c078ebc6", &["🧾"], Expense),
                sub(
                    "Spare parts, maintenance and cleaning costs",
                    "0176bf56861cfc5ef72d",
                    &["🔧"],
                    Expense,
                ),
                sub("Garage", "2bcd348acfe1bf3e7aec", &["🏢"], Expense),
                sub(
                    "Vehicle cost (renting, leasing, bank loan)",
                    "3fd1f7e8e2f828cbe212",
                    &["🚙"],
                    Expense,
                ),
                sub(
                    "Down payment for the vehicle",
                    "bc0670da0b15f4b6c201",
                    &["🔑", "🚙"],
                    Investment,
                ),
                sub("Fuel", "6f4ab3b2b1b3268d9138", &["⛽️"], Expense),
                sub("Tolls, parkings and tunnels", "a54b87aab3bf45fa393b", &["🅿️"], Expense),
            ],
        ),
        leaf(
            "Travels & holidays & weekend breaks",
            "c7f2653ce6672c5b1e52",
            &["🧳"],
            Expense,
        ),
        CategoryDefinition::new(
            "Home",
            "80a6d32180f700494c59",
            &["🏠"],
            Expense,
            vec![
                sub(
                    "Groceries, cleaning products, personal care products, objects, tools and cookware",
                    "3e8e136c59a6d961c0cd",
                    &["🍋", "🧹"],
                    Expense,
                ),
                sub("Appliances and furniture", "67020bb5be8f6f358be9", &["🪑", "📺"], Expense),
                sub("Electricity bill", "2795466d19a02edf91a2", &["⚡️"], Expense),
                sub("Water bill", "367152c689521a741912", &["💧"], Expense),
                sub("Gas bill", "09a4d2883e9605de3af5", &["💨"], Expense),
                sub(
                    "ISP provider bill (including TV, landline, and mobile phone)",
                    "649f5bae610a88cfafba",
                    &["🌐"],
                    Expense,
                ),
                sub(
                    "Down payment for the house",
                    "58c16c7f1b255d90dd3d",
                    &["🔑", "🏠"],
                    Investment,
                ),
                sub("Home taxes (includes garage)", "d074eabc7b8e111bc6a5", &["🧾"], Expense),
                sub("Home insurance", "79b8bc873e8aaf93e0d7", &["🧾"], Expense),
                sub(
                    "Taxes of the community of neighbors (includes garage)",
                    "c9382b5849da8fb87c4b",
                    &["🧾"],
                    Expense,
                ),
                sub("Repairs and home works", "6596560424b5a62054bb", &["🛠️"], Expense),
                sub("Mortgage", "f6e025e8988d541e6e64", &["🏠"], Expense),
                sub("Mortgage amortization", "3a559a96cc40fd784196", &["🏠", "⏩"], Investment),
                sub("Rent", "212d8beddfc1981bf3d2", &["🔑"], Expense),
            ],
        ),
        CategoryDefinition::new(
            "Professional career",
            "bb8c65f28a8aa0bf5c7b",
            &["👷🏻"],
            Expense,
            vec![
                sub("English classes", "0cdbdd7f2050a17778c9", &["🇬🇧"], Expense),
                sub(
                    "Books, events, conferences, formative courses, certifications",
                    "db5fa3a569a72dca9079",
                    &["📚", "🎟️"],
                    Expense,
                ),
            ],
        ),
        CategoryDefinition::new(
            "Leisure activities",
            "e2e8bfc9317cb340353a",
            &["🍿", "🎳"],
            Expense,
            vec![
                sub("Bar, restaurants and pubs", "a90ae2812b970bd8d6f5", &["🍺"], Expense),
                sub("Gym and climbing wall", "1f2db29fbcc94835f5ec", &["🤸🏻"], Expense),
                sub(
                    "Cinema, concerts, museums, and other cultural activities",
                    "8764609f8c1456aa10ff",
                    &["🍿", "🎺"],
                    Expense,
                ),
                sub("Camping, shelter", "d40c102031f4e79e23bc", &["⛺️"], Expense),
                sub(
                    "Recreational courses and formative sessions (cooking, alpinism, chess...)",
                    "b2cbe8b45593c0b39b5e",
                    &["🧑🏻‍🎓"],
                    Expense,
                ),
                sub(
                    "Social gathering",
                    "c5e7cadebd4b038ee612",
                    &["👨‍👩‍👧‍👦", "🎳", "🥂"],
                    Expense,
                ),
            ],
        ),
        CategoryDefinition::new(
            "Leisure items",
            "1d4edab5238364fbd183",
            &["📚", "🧩"],
            Expense,
            vec![
                sub(
                    "Books, music albums, videogames",
                    "55627d062a7a11a8c1c8",
                    &["📚", "💿", "👾"],
                    Expense,
                ),
                sub("Puzzles, board games", "a6dea8416e7616662843", &["🧩", "♟️"], Expense),
                sub("Collectibles, hobby items", "f40a284425ea71685ab5", &["🪙", "🪆"], Expense),
                sub("Adult toys, pleasure goods", "4962cd0b5929cdf151ee", &["🌶️"], Expense),
            ],
        ),
        leaf(
            "Sports equipment (including boots and jackets)",
            "7bc8a8ada1b72ddaffe9",
            &["🎿"],
            Expense,
        ),
        leaf("Other expenses", "2e1927ef52320e0e1507", &["🕳️"], Expense),
        leaf("Bank charges (commissions)", "dd388ee7192bcc12a247", &["🏦"], Expense),
        leaf("Government taxes", "404e021b5b22684ab693", &["🧾"], Expense),
        leaf(
            "Personal insurance (sport, life...)",
            "34a770c7aaecba94391f",
            &["🧾"],
            Expense,
        ),
        leaf(
            "Retirement plan and savings plan",
            "ecc399bcb94fbd2cfd6b",
            &["💰"],
            Saving,
        ),
        leaf("Lawyers and public notaries", "6308b902aef65f9fa489", &["🧑🏻‍⚖️"], Expense),
    ]
}
