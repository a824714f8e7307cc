//! Prompt templates. Every prompt starts from [`FARMING_CONTEXT`].

pub const FARMING_CONTEXT: &str = "You are an agricultural advisor for farmers in India, with a focus on Maharashtra.
You help with:
- Crop cultivation practices suited to Indian conditions
- Fertilizer plans by crop, soil type and growth stage
- Identifying pests and diseases, with organic and chemical remedies
- Adjusting field work to the weather
- Irrigation and water management
- Organic farming methods
- Government schemes for farmers such as PM-KISAN and PMFBY
- Reading mandi price trends and deciding when to sell
- Soil health and nutrient management

Answer in 2-4 short paragraphs of plain, practical language.
Offer both organic and chemical options where they exist.
For a photo of a diseased crop, name the disease clearly and give immediate treatment steps.
Keep the farmer's income and long-term soil health in mind.";

/// Question asked when an image arrives without one
pub const DEFAULT_IMAGE_QUESTION: &str = "What disease does this crop have? Suggest treatment.";

pub const DEFAULT_SOIL_TYPE: &str = "loamy";
pub const DEFAULT_GROWTH_STAGE: &str = "vegetative";

pub fn chat_prompt(message: &str) -> String {
    format!("{}\n\nUser: {}\n\nAssistant:", FARMING_CONTEXT, message)
}

pub fn diagnosis_prompt(question: &str) -> String {
    format!(
        "{}

The farmer has shared a photo of a crop. Look at it closely and cover:
1. The crop, if it can be identified
2. Visible diseases, pests or nutrient deficiencies
3. Organic or home-made treatments
4. Chemical treatments if organic ones do not work
5. How to prevent it next season
6. Expected recovery time

Farmer's question: {}

Be specific and practical, and mention approximate costs where useful.",
        FARMING_CONTEXT, question
    )
}

pub fn fertilizer_prompt(crop: &str, soil_type: &str, growth_stage: &str) -> String {
    format!(
        "{}

Give a fertilizer plan for:
- Crop: {}
- Soil type: {}
- Growth stage: {}

Include:
1. NPK ratio with quantities per acre
2. Organic options (compost, vermicompost, FYM) with quantities
3. Chemical options with brands sold in India
4. When and how to apply (broadcast, drip, foliar)
5. Approximate cost per acre for each option in rupees
6. Micronutrients such as zinc or boron, if needed
7. Common mistakes to avoid",
        FARMING_CONTEXT, crop, soil_type, growth_stage
    )
}

pub fn quick_tips_prompt(month: &str) -> String {
    format!(
        "{}

Give 5 short, numbered farming tips for Maharashtra farmers for {}.
Cover what to sow or harvest now, irrigation for the season, pests common this month,
soil preparation, and weather-related precautions. Keep each tip to 2-3 sentences.",
        FARMING_CONTEXT, month
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_carry_context_and_inputs() {
        let chat = chat_prompt("When should I sell onions?");
        assert!(chat.starts_with(FARMING_CONTEXT));
        assert!(chat.ends_with("User: When should I sell onions?\n\nAssistant:"));

        let fert = fertilizer_prompt("Cotton", "black", "flowering");
        assert!(fert.contains("Crop: Cotton") && fert.contains("Soil type: black") && fert.contains("Growth stage: flowering"));

        assert!(quick_tips_prompt("October").contains("for October"));
        assert!(diagnosis_prompt(DEFAULT_IMAGE_QUESTION).contains(DEFAULT_IMAGE_QUESTION));
    }
}
