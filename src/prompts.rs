//! Analysis prompts for master plans and floor plans.
//!
//! The two templates are static data selected by [`PlanType`]. User edits
//! live in an owned [`AnalysisPrompt`] that starts as a copy of the template,
//! so editing never touches the constants and [`AnalysisPrompt::reset`] can
//! always restore the original wording.
//!
//! Both templates describe the five-page layout produced by
//! [`crate::assemble`] so the model knows that pages 2–5 are close-ups.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default prompt for a master (site) plan.
pub const MASTER_PLAN_PROMPT: &str = r#"As the builder of this property, your task is to sell this master plan. Extract and present information from the provided PDF. Be concise, direct, and factual, adhering strictly to what is visibly presented or explicitly stated in the master plan sections, without assumptions or excessive synonyms. Utilize the detailed views from pages 2-5.

PDF Structure Overview:
Page 1: Full master plan view.
Page 2: Focus on the upper-left quadrant.
Page 3: Focus on the upper-right quadrant.
Page 4: Focus on the lower-left quadrant.
Page 5: Focus on the lower-right quadrant.

Present the master plan's features by describing the following points. Focus on rigorous, eye-catching details.
Project Scope: State the total land area, number of units, and number of towers. Mention project launch and completion dates if visible.
Land Use & Density: Identify and specify designated zones (e.g., residential, commercial, open spaces) and their visible allocations or percentages. State units per acre.
Connectivity & Access: Detail visible internal road networks, primary access points, and any significant external connectivity features. Mention widths if indicated.
On-Site Features & Amenities: List all explicitly drawn or labeled amenities (e.g., clubhouse, parks, sports courts, specific utility placements). State any visible area sizes for these features.
Key Dimensions & Figures: Provide any other directly stated measurements, capacities, or distinguishing numerical facts about the master plan components."#;

/// Default prompt for a single-unit floor plan.
pub const FLOOR_PLAN_PROMPT: &str = r#"As the builder of this property, your task is to sell this floor plan. Extract and present information from the provided PDF. Be concise, direct, and factual, adhering strictly to what is visibly presented or explicitly stated in the floor plan, without assumptions or excessive synonyms. Utilize the detailed views from pages 2-5 for granular insights into each section.

PDF Structure Overview:
Page 1: Full floor plan view.
Page 2: Focus on the upper-left quadrant.
Page 3: Focus on the upper-right quadrant.
Page 4: Focus on the lower-left quadrant.
Page 5: Focus on the lower-right quadrant.

Present the floor plan's features by describing the following points. Focus on rigorous, eye-catching details.
Unit Overview: State the visible unit typology (e.g., 2BHK, 3BHK). Provide overall visible area figures like Saleable Area and RERA Carpet Area, along with efficiency percentages if shown.
Room-by-Room Details: Identify and describe each primary room (e.g., Living, Dining, Kitchen, Master Bedroom, other Bedrooms, Bathrooms). State any visible dimensions (length x width) or explicit area measurements for each.
Functional Spaces & Flow: Detail visible utility areas, balconies (including number and area percentage if available), and storage niches. Describe the visible internal circulation and connectivity between spaces.
Key Dimensions & Features: Provide any other directly stated measurements such as floor-to-ceiling height. Mention visible design elements like the number of lifts per tower or units per floor if relevant to the unit's context.
Light & Ventilation Assessment: Based on the visible layout, describe the apparent natural light and ventilation characteristics of key areas, noting window placements or air flow indicators."#;

/// Which kind of drawing the user uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlanType {
    #[default]
    MasterPlan,
    FloorPlan,
}

impl PlanType {
    pub fn default_prompt(self) -> &'static str {
        match self {
            PlanType::MasterPlan => MASTER_PLAN_PROMPT,
            PlanType::FloorPlan => FLOOR_PLAN_PROMPT,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlanType::MasterPlan => "Master Plan",
            PlanType::FloorPlan => "Floor Plan",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The prompt that will be sent with the plan PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisPrompt {
    plan_type: PlanType,
    text: String,
}

impl AnalysisPrompt {
    /// Seed the prompt with the template for `plan_type`.
    pub fn new(plan_type: PlanType) -> Self {
        Self {
            plan_type,
            text: plan_type.default_prompt().to_owned(),
        }
    }

    /// Start from user-supplied text instead of the template.
    pub fn with_text(plan_type: PlanType, text: impl Into<String>) -> Self {
        Self {
            plan_type,
            text: text.into(),
        }
    }

    pub fn plan_type(&self) -> PlanType {
        self.plan_type
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Switch plan type. An unedited prompt follows the new template; an
    /// edited one is left alone.
    pub fn set_plan_type(&mut self, plan_type: PlanType) {
        if self.is_default() {
            self.text = plan_type.default_prompt().to_owned();
        }
        self.plan_type = plan_type;
    }

    /// Discard edits.
    pub fn reset(&mut self) {
        self.text = self.plan_type.default_prompt().to_owned();
    }

    pub fn is_default(&self) -> bool {
        self.text == self.plan_type.default_prompt()
    }

    /// `true` when the prompt is empty after trimming whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl Default for AnalysisPrompt {
    fn default() -> Self {
        Self::new(PlanType::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_describe_the_page_structure() {
        for t in [PlanType::MasterPlan, PlanType::FloorPlan] {
            let p = t.default_prompt();
            assert!(p.contains("Page 1:"));
            assert!(p.contains("Page 5: Focus on the lower-right quadrant."));
        }
        assert!(MASTER_PLAN_PROMPT.contains("master plan"));
        assert!(FLOOR_PLAN_PROMPT.contains("floor plan"));
    }

    #[test]
    fn edits_do_not_touch_the_template() {
        let mut prompt = AnalysisPrompt::new(PlanType::FloorPlan);
        assert!(prompt.is_default());

        prompt.set_text("Describe the kitchen only.");
        assert!(!prompt.is_default());
        assert_eq!(PlanType::FloorPlan.default_prompt(), FLOOR_PLAN_PROMPT);

        prompt.reset();
        assert_eq!(prompt.text(), FLOOR_PLAN_PROMPT);
    }

    #[test]
    fn switching_plan_type_follows_template_only_when_unedited() {
        let mut prompt = AnalysisPrompt::new(PlanType::MasterPlan);
        prompt.set_plan_type(PlanType::FloorPlan);
        assert_eq!(prompt.text(), FLOOR_PLAN_PROMPT);

        prompt.set_text("custom");
        prompt.set_plan_type(PlanType::MasterPlan);
        assert_eq!(prompt.text(), "custom");
        assert_eq!(prompt.plan_type(), PlanType::MasterPlan);
    }

    #[test]
    fn blank_detection_trims_whitespace() {
        assert!(AnalysisPrompt::with_text(PlanType::FloorPlan, " \n\t ").is_blank());
        assert!(!AnalysisPrompt::default().is_blank());
    }

    #[test]
    fn labels() {
        assert_eq!(PlanType::MasterPlan.to_string(), "Master Plan");
        assert_eq!(PlanType::FloorPlan.label(), "Floor Plan");
    }
}
