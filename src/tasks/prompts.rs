//! Prompt wording for every unit kind and for the routing call.
//!
//! Specialist templates may be overridden per profile; the coordinator's
//! synthesis, review and routing wording is fixed.

/// Default assessment wording for a specialist.
pub const DEFAULT_ASSESSMENT_TEMPLATE: &str = "\
Review the message below and determine whether it falls within your area of \
expertise as {expert} ({expertise}). If it does, prepare to provide insights. \
If it does not, decline politely.

Message:
{message}";

pub const ASSESSMENT_EXPECTED_OUTPUT: &str = "\
Either 'RELEVANT' with a brief note on why this falls in your expertise, \
OR 'NOT RELEVANT - No insights to add.'";

/// Default response wording for a specialist.
pub const DEFAULT_RESPONSE_TEMPLATE: &str = "\
Provide a concise, actionable response to the message based on your expertise \
as {expert} ({expertise}). Your relevance assessment is included as context. \
Focus on practical insights, strategic recommendations or tactical guidance that \
directly addresses the sender's needs. Keep the response focused and implementable.

Message:
{message}";

pub const RESPONSE_EXPECTED_OUTPUT: &str = "\
A thoughtful, actionable paragraph (3-5 sentences) that provides specific value \
based on your expertise. Include concrete next steps or frameworks when applicable.";

/// Synthesis wording. `{experts}` is one line per selected expert.
pub const SYNTHESIS_TEMPLATE: &str = "\
Compile all expert responses provided as context into a cohesive, well-structured \
reply. Organize the insights by expert using clear markdown headers with each \
expert's emoji. Keep each expert's voice while making the reply read as one message.

Selected experts, in the order their responses appear in the context:
{experts}

Use this structure:
- Start with an executive summary
- Present each expert's insights under an emoji header
- Include concrete next steps
- End with integrated recommendations

Original Message:
{message}";

pub const SYNTHESIS_EXPECTED_OUTPUT: &str = "\
A professionally formatted markdown reply:

## 🎯 Key Insights from Expert Panel

**Executive Summary:** [Brief overview of main recommendations]

---

### [Emoji] [Expert Name] on [Expertise Area]
*[Expert's main insight and recommendations]*

**Key Actions:**
- [Specific actionable item 1]
- [Specific actionable item 2]

---

[Repeat for each expert]

---

## 🎯 Integrated Recommendations

**Immediate Actions (Next 30 Days):**
1. [Priority action item]
2. [Priority action item]

**Strategic Initiatives (Next Quarter):**
1. [Strategic initiative]
2. [Strategic initiative]

---

*This response was generated by our Expert Advisory Panel. For follow-up questions or deeper \
discussion on any of these areas, please let us know.*";

pub const REVIEW_TEMPLATE: &str = "\
Review the synthesized reply provided as context for clarity, completeness and \
professionalism. Check that every key point of the original message is addressed \
and that the reply gives the sender genuine value.

Original Message:
{message}";

pub const REVIEW_EXPECTED_OUTPUT: &str = "\
Either 'APPROVED' if the reply meets quality standards, OR specific recommendations \
for improvement focusing on clarity, completeness or actionability.";

/// Routing wording. `{catalogue}` is one line per registered specialist.
pub const ROUTING_TEMPLATE: &str = "\
Analyze the message below and select the experts whose expertise is most relevant \
to it. Select at most {max_experts}. Only select experts that can add real value.

Available experts:
{catalogue}

Message:
{message}";

pub const ROUTING_EXPECTED_OUTPUT: &str = "\
A first line of the form 'Selected experts: <id>, <id>' using the ids listed above, \
followed by one short sentence per selected expert explaining the choice.";

/// Appended to prompts whose output must be markdown.
pub const MARKDOWN_INSTRUCTION: &str = "\
Your final answer MUST be formatted in Markdown syntax.
Follow these guidelines:
- Use # for headers
- Use ** for bold text
- Use * for italic text
- Use - or * for bullet points";

/// Placeholders a specialist template may use.
pub const SPECIALIST_PLACEHOLDERS: &[&str] = &["expert", "display_name", "expertise", "message"];

/// Placeholder every specialist template must use.
pub const MESSAGE_PLACEHOLDER: &str = "message";
