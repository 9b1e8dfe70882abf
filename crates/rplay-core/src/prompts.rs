//! Instructions and per-request prompts for each use case
//!
//! The same instructions serve as a managed agent's standing instructions and
//! as the system prompt on the direct path, so both tiers see equivalent input.

use serde_json::{Map, Value};

use crate::types::{
    ClientProfile, Competency, ConversationTurn, Difficulty, Objective, PersonalitySettings,
    Rubric, SimulationSettings, TurnRole,
};

/// Opening line used when the starter generator returns nothing
pub const DEFAULT_STARTER: &str = "Hello, I'm here to discuss my financial situation. \
    I've been thinking about my future and wanted to get some professional advice.";

/// How many turns the guidance prompt shows
pub const GUIDANCE_WINDOW: usize = 10;

/// Direct-path system prompt for conversation openers
pub const STARTER_SYSTEM_PROMPT: &str = "You are roleplaying as a financial advisory client.";

pub const SIMULATION_CLIENT_INSTRUCTIONS: &str = "\
You are an AI client in a training simulation. Your role is to behave as a realistic client with the personality traits, background, and needs specified in your profile.

IMPORTANT GUIDELINES:
1. You are the CLIENT, not the advisor. Respond as if you are seeking financial advice.
2. Stay in character throughout the conversation.
3. Respond naturally and conversationally, avoiding robotic language.
4. Never reference that you are an AI or break character.
5. Use the available tools to:
   - Get your client profile details when needed
   - Understand your emotional state for appropriate responses
   - Track conversation objectives progress

DIFFICULTY BEHAVIORS:
- Beginner: Be friendly, cooperative, and open. Provide information readily.
- Intermediate: Be somewhat reserved. Only reveal details when asked specifically or when trust is established.
- Advanced: Be skeptical and challenging. Question recommendations and raise objections.

For your first response, introduce yourself briefly with just your name and a general reason for meeting with the advisor.";

pub const PROFILE_GENERATION_INSTRUCTIONS: &str = "\
You are a profile generator for financial advisory training simulations. Your role is to create diverse, realistic client personas that challenge advisors at various skill levels.

GUIDELINES:
1. Generate profiles that are realistic and relatable
2. Include varied backgrounds, financial situations, and goals
3. Consider the industry context for relevant concerns
4. Match complexity to the specified difficulty level
5. Create profiles that offer learning opportunities for advisors

DIFFICULTY LEVELS:
- Beginner: Simple, straightforward situations with clear needs
- Intermediate: More complex situations with multiple goals and some concerns
- Advanced: Complex situations with conflicting needs, objections, and nuanced concerns

Use the available tools to:
- Get industry-specific settings for relevant context
- Get difficulty settings for appropriate complexity
- Validate the generated profile structure

Always return profiles as valid JSON with consistent structure.";

pub const EVALUATION_INSTRUCTIONS: &str = "\
You are an expert evaluator for financial advisor training simulations. Your role is to analyze conversations between advisors and clients, providing fair and constructive assessments.

EVALUATION GUIDELINES:
1. Base evaluations on observable behaviors in the conversation
2. Provide specific, actionable feedback
3. Balance positive recognition with areas for improvement
4. Consider the difficulty level when evaluating
5. Be constructive, not discouraging

COMPETENCY AREAS:
- Building Rapport: Establishing connection and trust
- Needs Assessment: Discovering client's situation and goals
- Handling Objections: Addressing concerns professionally
- Providing Recommendations: Suggesting appropriate solutions

Use the available tools to:
- Get competency definitions and rubrics
- Calculate scores based on observed behaviors
- Track objective progress throughout conversations

Always provide evidence-based assessments with specific examples from the conversation.";

pub const EXPERT_GUIDANCE_INSTRUCTIONS: &str = "\
You are an expert financial advisor trainer providing guidance to an advisor in a training simulation. Your role is to help advisors improve their skills and succeed in their client interactions.

GUIDANCE PRINCIPLES:
1. Be supportive and encouraging while being honest
2. Provide specific, actionable advice
3. Reference the actual conversation when giving suggestions
4. Consider the client's profile and personality when advising
5. Help advisors develop transferable skills

RESPONSE STYLE:
- Keep responses focused and practical
- Prioritize the most important advice first
- Suggest specific phrases or approaches when helpful
- Consider the difficulty level and adjust expectations accordingly

Use the available tools to:
- Get current objectives and progress
- Get simulation context including client information

Remember: You are helping the ADVISOR, not the client. Your goal is to improve their advisory skills.";

/// Render turns as `Advisor:` / `Client:` lines, skipping system turns
pub fn format_conversation(turns: &[ConversationTurn], empty: &str) -> String {
    let lines: Vec<String> = turns
        .iter()
        .filter_map(|turn| match turn.role {
            TurnRole::System => None,
            TurnRole::Advisor => Some(format!("Advisor: {}", turn.text)),
            TurnRole::Client => Some(format!("Client: {}", turn.text)),
        })
        .collect();

    if lines.is_empty() {
        empty.to_string()
    } else {
        lines.join("\n")
    }
}

/// Like [`format_conversation`] but only the last `window` turns, with a marker
/// for what was left out
pub fn format_recent_conversation(turns: &[ConversationTurn], window: usize) -> String {
    let skipped = turns.len().saturating_sub(window);
    let recent = format_conversation(&turns[skipped..], "(No conversation yet)");
    if skipped > 0 {
        format!("[... {} earlier messages omitted ...]\n{}", skipped, recent)
    } else {
        recent
    }
}

fn join_or(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.join(", ")
    }
}

fn or_unknown(s: &str) -> &str {
    if s.is_empty() { "Unknown" } else { s }
}

fn age_label(profile: &ClientProfile) -> String {
    profile
        .age
        .map(|a| a.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn profile_context(
    profile: &ClientProfile,
    personality: &PersonalitySettings,
    simulation: &SimulationSettings,
) -> String {
    format!(
        "Current Client Context:
- Name: {name}
- Age: {age}
- Occupation: {occupation}
- Income: {income}
- Family Status: {family}
- Goals: {goals}

Personality:
- Mood: {mood}
- Archetype: {archetype}

Industry: {industry}
Difficulty: {difficulty}

Behavior Guidelines: {guidelines}",
        name = profile.display_name(),
        age = age_label(profile),
        occupation = or_unknown(&profile.occupation),
        income = or_unknown(&profile.income),
        family = or_unknown(&profile.family),
        goals = join_or(&profile.goals, "Not specified"),
        mood = personality.mood,
        archetype = personality.archetype,
        industry = simulation.industry_label(),
        difficulty = simulation.difficulty,
        guidelines = simulation.difficulty.guidelines(),
    )
}

/// Message sent to the simulation-client agent for one conversational turn
pub fn client_turn_prompt(
    turns: &[ConversationTurn],
    profile: &ClientProfile,
    personality: &PersonalitySettings,
    simulation: &SimulationSettings,
) -> String {
    format!(
        "{}\n\nConversation so far:\n{}\n\nRespond as the client:",
        profile_context(profile, personality, simulation),
        format_conversation(turns, "(Start of conversation)")
    )
}

/// System prompt for the direct path: persona instructions plus the full profile
pub fn client_system_prompt(
    profile: &ClientProfile,
    personality: &PersonalitySettings,
    simulation: &SimulationSettings,
) -> String {
    let profile_json = serde_json::to_string_pretty(profile).unwrap_or_default();
    format!(
        "{}\n\n{}\n\nClient Profile:\n{}\n\nRoleplay as this client. Stay in character. \
         Respond naturally based on the client's personality, goals, and concerns.",
        SIMULATION_CLIENT_INSTRUCTIONS,
        profile_context(profile, personality, simulation),
        profile_json
    )
}

pub fn profile_prompt(industry: &str, difficulty: Difficulty, parameters: &Map<String, Value>) -> String {
    let extra = if parameters.is_empty() {
        String::new()
    } else {
        format!(
            "\n\nAdditional parameters to respect:\n{}",
            serde_json::to_string_pretty(parameters).unwrap_or_default()
        )
    };

    format!(
        "Generate a realistic client profile for a {industry} simulation at {difficulty} difficulty level.

The profile must include:
- Name (realistic first and last name)
- Age (appropriate for financial planning needs)
- Occupation (realistic job title)
- Income range
- Family status
- 2-4 specific financial goals
- 2-3 concerns or hesitations
- Brief background context
- 2-3 personality traits
- Communication style preference{extra}

Return ONLY a valid JSON object with this structure:
{{
  \"name\": \"Full Name\",
  \"age\": 45,
  \"occupation\": \"Job Title\",
  \"income\": \"$X - $Y annually\",
  \"family\": \"Married with 2 children\",
  \"goals\": [\"goal1\", \"goal2\"],
  \"concerns\": [\"concern1\", \"concern2\"],
  \"background\": \"Brief background...\",
  \"personality_traits\": [\"trait1\", \"trait2\"],
  \"communication_style\": \"direct/analytical/emotional/etc.\"
}}"
    )
}

pub fn starter_prompt(profile: &ClientProfile) -> String {
    let profile_json = serde_json::to_string_pretty(profile).unwrap_or_default();
    format!(
        "Given this client profile, generate a realistic opening message from the client \
         starting the conversation with their financial advisor.

Client Profile:
{profile_json}

The message should:
- Be natural and conversational
- Reflect the client's personality and communication style
- Hint at their primary concern or goal
- Be appropriate as a first message in the meeting

Return ONLY the client's opening message, no quotes or prefixes."
    )
}

pub fn review_prompt(
    turns: &[ConversationTurn],
    competencies: &[Competency],
    rubrics: &[Rubric],
    difficulty: Option<Difficulty>,
) -> String {
    let names: Vec<String> = competencies.iter().map(|c| c.name.clone()).collect();
    let rubric_lines = if rubrics.is_empty() {
        String::new()
    } else {
        let lines: Vec<String> = rubrics
            .iter()
            .map(|r| format!("- {} (weight: {})", r.criteria, r.weight))
            .collect();
        format!("\nRubrics:\n{}\n", lines.join("\n"))
    };
    let difficulty = difficulty
        .map(|d| d.to_string())
        .unwrap_or_else(|| "Not specified".to_string());

    format!(
        "Evaluate this advisor-client conversation and generate a detailed performance review.

Difficulty Level: {difficulty}
Competencies Being Evaluated: {competencies}
{rubric_lines}
Conversation:
{conversation}

Generate a comprehensive performance review with:
1. An overall score (1-10)
2. Individual competency scores (1-10 each)
3. Specific strengths observed (with examples)
4. Areas for improvement (with suggestions)
5. A summary of overall performance

Return your evaluation as a JSON object:
{{
  \"overallScore\": <number 1-10>,
  \"competencyScores\": [
    {{\"name\": \"<competency>\", \"score\": <number 1-10>, \"strengths\": [\"...\"], \"improvements\": [\"...\"], \"expectation\": \"...\"}}
  ],
  \"generalStrengths\": [\"strength1\", \"strength2\"],
  \"generalImprovements\": [\"improvement1\", \"improvement2\"],
  \"summary\": \"Overall performance summary...\"
}}",
        competencies = join_or(&names, "General performance"),
        conversation = format_conversation(turns, "(No conversation)"),
    )
}

pub fn objectives_prompt(turns: &[ConversationTurn]) -> String {
    format!(
        "Evaluate the advisor's performance in this conversation and assess progress on these objectives:

1. Building Rapport: Establishing connection with the client (0-100%)
2. Needs Assessment: Discovering client's financial situation and goals (0-100%)
3. Handling Objections: Addressing concerns professionally (0-100%)
4. Providing Recommendations: Suggesting appropriate options (0-100%)

IMPORTANT SCORING INSTRUCTIONS:
- Base your evaluation on the ENTIRE conversation, not just the last message
- Scores should generally not decrease unless there's a significant mistake
- Even brief exchanges showing warmth/professionalism contribute to rapport (10-30%)
- Questions about client's situation contribute to needs assessment (15-40%)

Conversation:
{}

Report your assessment with the track_objective_progress tool if it is available, \
and reply with the same assessment as a JSON object:
{{\"rapport\": <0-100>, \"needs\": <0-100>, \"objections\": <0-100>, \"recommendations\": <0-100>, \"explanation\": \"...\"}}",
        format_conversation(turns, "(No conversation)")
    )
}

fn guidance_context(
    profile: &ClientProfile,
    simulation: &SimulationSettings,
    objectives: &[Objective],
) -> String {
    let objectives_text = if objectives.is_empty() {
        "No objectives data available".to_string()
    } else {
        objectives
            .iter()
            .map(|o| format!("- {}: {}% complete", o.name, o.progress))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Simulation Context:

Client Profile:
- Name: {name}
- Age: {age}
- Occupation: {occupation}
- Goals: {goals}
- Concerns: {concerns}

Industry: {industry}
Difficulty Level: {difficulty}

Competencies Being Evaluated: {competencies}

Current Objectives Progress:
{objectives_text}",
        name = profile.display_name(),
        age = age_label(profile),
        occupation = or_unknown(&profile.occupation),
        goals = join_or(&profile.goals, "Unknown"),
        concerns = join_or(&profile.concerns, "Unknown"),
        industry = simulation.industry_label(),
        difficulty = simulation.difficulty,
        competencies = join_or(&simulation.competencies, "None specified"),
    )
}

pub fn guidance_prompt(
    turns: &[ConversationTurn],
    profile: &ClientProfile,
    simulation: &SimulationSettings,
    objectives: &[Objective],
) -> String {
    format!(
        "{}

Recent conversation:
{}

The advisor has asked for your guidance. Provide clear, practical, and supportive advice to help them succeed in this simulation.

Consider:
1. What's going well in the conversation?
2. What could be improved?
3. What specific strategies might help with this client?
4. What should be the advisor's next focus?

Provide actionable guidance that helps the advisor improve.",
        guidance_context(profile, simulation, objectives),
        format_recent_conversation(turns, GUIDANCE_WINDOW)
    )
}
