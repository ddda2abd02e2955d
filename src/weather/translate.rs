//! Static translation of provider weather descriptions

const TRANSLATIONS: &[(&str, &str)] = &[
    ("clear sky", "ясное небо"),
    ("few clouds", "малооблачно"),
    ("scattered clouds", "рассеянные облака"),
    ("broken clouds", "облачно"),
    ("overcast clouds", "пасмурно"),
    ("light rain", "небольшой дождь"),
    ("moderate rain", "умеренный дождь"),
    ("heavy intensity rain", "сильный дождь"),
    ("shower rain", "ливень"),
    ("thunderstorm", "гроза"),
    ("snow", "снег"),
    ("light snow", "небольшой снег"),
    ("heavy snow", "сильный снег"),
    ("mist", "туман"),
    ("fog", "густой туман"),
];

/// Translate a provider description; unknown phrases are returned unchanged.
#[must_use]
pub fn translate_description(description: &str) -> String {
    let key = description.to_lowercase();
    TRANSLATIONS
        .iter()
        .find(|(source, _)| *source == key)
        .map_or_else(|| description.to_string(), |(_, target)| (*target).to_string())
}
