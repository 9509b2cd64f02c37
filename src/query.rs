//! Rule-based classification of free-text financial questions.
//!
//! Every stage is a pure function of the normalized query text. The result
//! steers which figures are fetched for the chat answer and is returned to
//! clients as-is for display.

use std::sync::LazyLock;

use async_graphql::{Enum, SimpleObject};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Inputs longer than this are truncated before any pattern runs.
pub(crate) const MAX_QUERY_CHARS: usize = 2_000;

/// Timeframe assumed by callers when the query names none.
pub(crate) const DEFAULT_TIMEFRAME: Timeframe = Timeframe::Month;

const MATCHED_CONFIDENCE: f64 = 0.9;
const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Suggested prompts shown next to the chat box.
pub(crate) const EXAMPLE_QUERIES: &[&str] = &[
    "What's my current balance?",
    "How much did I spend on food last month?",
    "Show me my spending breakdown by category",
    "What's my income this month?",
    "Am I within my budget this month?",
    "Compare my spending this month vs last month",
    "Forecast my expenses for next month",
    "How are my savings goals progressing?",
    "How much debt do I have left?",
    "What's my average transport spending per week?",
];

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum IntentType {
    Balance,
    Spending,
    Income,
    Budget,
    Comparison,
    Forecast,
    Goals,
    Debt,
    General,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Timeframe {
    Today,
    Week,
    Month,
    LastMonth,
    Quarter,
    Year,
    All,
    Custom,
}

impl Timeframe {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Timeframe::Today => "today",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
            Timeframe::LastMonth => "last_month",
            Timeframe::Quarter => "quarter",
            Timeframe::Year => "year",
            Timeframe::All => "all",
            Timeframe::Custom => "custom",
        }
    }
}

/// Spending categories the classifier knows about. Declaration order is the
/// order in which extracted categories are reported.
#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Category {
    Food,
    Transport,
    Shopping,
    Entertainment,
    Bills,
    Health,
    Education,
}

impl Category {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Transport => "transport",
            Category::Shopping => "shopping",
            Category::Entertainment => "entertainment",
            Category::Bills => "bills",
            Category::Health => "health",
            Category::Education => "education",
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Operation {
    Total,
    Average,
    Count,
    Trend,
    Breakdown,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ComparisonBaseline {
    LastMonth,
    LastYear,
    Budget,
    Goal,
}

#[derive(SimpleObject, Clone, Debug, PartialEq, Serialize)]
pub(crate) struct QueryIntent {
    #[graphql(name = "type")]
    #[serde(rename = "type")]
    pub(crate) kind: IntentType,
    pub(crate) timeframe: Option<Timeframe>,
    pub(crate) categories: Vec<Category>,
    pub(crate) operation: Option<Operation>,
    pub(crate) comparison: Option<ComparisonBaseline>,
    pub(crate) amount: Option<f64>,
}

#[derive(SimpleObject, Clone, Debug, PartialEq, Serialize)]
pub(crate) struct ProcessedQuery {
    pub(crate) intent: QueryIntent,
    /// The query exactly as the user typed it.
    pub(crate) original_query: String,
    /// 0.9 when an intent rule fired, 0.3 for the `general` fallback.
    pub(crate) confidence: f64,
    pub(crate) suggested_response: String,
}

struct Rule<T> {
    tag: T,
    pattern: Regex,
}

fn rules<T: Copy>(table: &[(T, &str)]) -> Vec<Rule<T>> {
    table
        .iter()
        .map(|&(tag, pattern)| Rule {
            tag,
            pattern: RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .expect("built-in patterns are valid"),
        })
        .collect()
}

/// Returns the tag of the first rule whose pattern matches.
fn first_match<T: Copy>(rules: &[Rule<T>], text: &str) -> Option<T> {
    rules
        .iter()
        .find(|rule| rule.pattern.is_match(text))
        .map(|rule| rule.tag)
}

/// Intent rules in priority order; the first match wins.
static INTENT_RULES: LazyLock<Vec<Rule<IntentType>>> = LazyLock::new(|| {
    rules(&[
        (
            IntentType::Comparison,
            r"\b(compar(e|ed|es|ing|ison)|difference|versus|vs\.?|than)\b|\bincome\s+(vs\.?|versus|and)\s+expenses?\b",
        ),
        (
            IntentType::Forecast,
            r"\b(forecast|predict|prediction|projected|projection|will i|going to|next (week|month|quarter|year)|future)\b",
        ),
        (
            IntentType::Income,
            r"\b(income|earn|earned|earning|earnings|salary|paycheck|paychecks|wages?|revenue|got paid)\b",
        ),
        (
            IntentType::Debt,
            r"\b(debts?|loans?|owe|owed|owing|mortgage|credit cards?|liabilit(y|ies)|pay off)\b",
        ),
        (
            IntentType::Balance,
            r"\b(balances?|net worth|how much (money )?do i have|money do i have)\b",
        ),
        (
            IntentType::Spending,
            r"\b(spend|spends|spent|spending|expenses?|expenditures?|costs?|paid|purchases?|bought)\b",
        ),
        (
            IntentType::Budget,
            r"\b(budgets?|budgeting|limits?|allowance|overspend|overspent)\b",
        ),
        (
            IntentType::Goals,
            r"\b(goals?|targets?|save|saved|saving|savings|milestones?)\b",
        ),
    ])
});

// Each rule names a current period. There is no variant for the previous
// week, quarter or year, so "last year" and the like leave the timeframe
// absent rather than resolving to the current period.
static TIMEFRAME_RULES: LazyLock<Vec<Rule<Timeframe>>> = LazyLock::new(|| {
    rules(&[
        (Timeframe::Today, r"\b(today|tonight|this morning)\b"),
        (
            Timeframe::Week,
            r"\b(this|current)\s+week\b|\bweekly\b|\bweek\s+to\s+date\b",
        ),
        // Never matches "last month": that belongs to the next rule.
        (
            Timeframe::Month,
            r"\b(this|current)\s+month\b|\bmonthly\b|\bmonth\s+to\s+date\b",
        ),
        (Timeframe::LastMonth, r"\b(last|previous|prior|past)\s+month\b"),
        (
            Timeframe::Quarter,
            r"\b(this|current)\s+quarter\b|\bquarterly\b|\bquarter\s+to\s+date\b",
        ),
        (
            Timeframe::Year,
            r"\b(this|current)\s+year\b|\b(yearly|annual|annually|ytd)\b|\byear\s+to\s+date\b",
        ),
        (Timeframe::All, r"\b(all[\s-]time|ever|overall|lifetime)\b"),
    ])
});

static DATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,2}/\d{1,2}/\d{4}\b|\b\d{4}-\d{2}-\d{2}\b")
        .expect("built-in patterns are valid")
});

static CATEGORY_RULES: LazyLock<Vec<Rule<Category>>> = LazyLock::new(|| {
    rules(&[
        (
            Category::Food,
            r"\b(food|groceries|grocery|restaurants?|dining|eating|meals?|lunch|dinner|breakfast|coffee|takeout)\b",
        ),
        (
            Category::Transport,
            r"\b(transport|transportation|gas|fuel|uber|lyft|taxi|bus|train|transit|parking|car)\b",
        ),
        (
            Category::Shopping,
            r"\b(shopping|shop|clothes|clothing|amazon|retail|electronics)\b",
        ),
        (
            Category::Entertainment,
            r"\b(entertainment|movies?|netflix|games?|gaming|concerts?|streaming|music|hobbies)\b",
        ),
        (
            Category::Bills,
            r"\b(bills?|utilit(y|ies)|rent|electricity|water|internet|phone|insurance|subscriptions?)\b",
        ),
        (
            Category::Health,
            r"\b(health|healthcare|medical|doctor|pharmacy|medicine|fitness|gym|dental|hospital)\b",
        ),
        (
            Category::Education,
            r"\b(education|tuition|school|books?|courses?|university|college|classes)\b",
        ),
    ])
});

static OPERATION_RULES: LazyLock<Vec<Rule<Operation>>> = LazyLock::new(|| {
    rules(&[
        (Operation::Total, r"\b(total|sum|altogether|how much)\b"),
        (
            Operation::Average,
            r"\b(average|avg|mean|typical|typically|per\s+(day|week|month|year))\b",
        ),
        (Operation::Count, r"\b(how many|count|number of|times)\b"),
        (
            Operation::Trend,
            r"\b(trends?|trending|over time|patterns?|history|increas(e|ed|ing)|decreas(e|ed|ing))\b",
        ),
        (
            Operation::Breakdown,
            r"\b(breakdown|break\s+down|by category|per category|categories|split|distribution|itemi[sz]e)\b",
        ),
    ])
});

// Each baseline needs a comparison cue in front of it, so a plain
// "last month" timeframe does not count as a baseline.
static COMPARISON_RULES: LazyLock<Vec<Rule<ComparisonBaseline>>> = LazyLock::new(|| {
    rules(&[
        (
            ComparisonBaseline::LastMonth,
            r"\b(vs\.?|versus|against|to|with|than|from)\s+(the\s+)?(last|previous|prior)\s+month\b|\bmonth[\s-](over|on)[\s-]month\b",
        ),
        (
            ComparisonBaseline::LastYear,
            r"\b(vs\.?|versus|against|to|with|than|from)\s+(the\s+)?(last|previous|prior)\s+year\b|\byear[\s-](over|on)[\s-]year\b|\byoy\b",
        ),
        (
            ComparisonBaseline::Budget,
            r"\b(vs\.?|versus|against|to|with|than|over|under|within|on)\s+(my\s+|the\s+)?budgets?\b",
        ),
        (
            ComparisonBaseline::Goal,
            r"\b(vs\.?|versus|against|to|towards?|with|than)\s+(my\s+|the\s+)?(savings?\s+)?(goals?|targets?)\b",
        ),
    ])
});

// Anchored on the leading side only: digits glued to a word ("abc42") are
// not an amount, while "$10k" still yields 10 and "$5.5" yields 5.5.
static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\$|\b)(\d+(?:,\d{3})*(?:\.\d{1,2})?)").expect("built-in patterns are valid")
});

/// Classifies `text` into a [`ProcessedQuery`]. Never fails; unknown text
/// falls back to [`IntentType::General`].
pub(crate) fn process_query(text: &str) -> ProcessedQuery {
    let normalized = normalize(text);
    let (kind, confidence) = match first_match(&INTENT_RULES, &normalized) {
        Some(kind) => (kind, MATCHED_CONFIDENCE),
        None => (IntentType::General, FALLBACK_CONFIDENCE),
    };
    let intent = QueryIntent {
        kind,
        timeframe: extract_timeframe(&normalized),
        categories: extract_categories(&normalized),
        operation: first_match(&OPERATION_RULES, &normalized),
        comparison: first_match(&COMPARISON_RULES, &normalized),
        amount: extract_amount(&normalized),
    };
    let suggested_response = suggest_response(&intent);

    ProcessedQuery {
        intent,
        original_query: text.to_string(),
        confidence,
        suggested_response,
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase().chars().take(MAX_QUERY_CHARS).collect()
}

fn extract_timeframe(text: &str) -> Option<Timeframe> {
    first_match(&TIMEFRAME_RULES, text)
        .or_else(|| DATE_TOKEN.is_match(text).then_some(Timeframe::Custom))
}

fn extract_categories(text: &str) -> Vec<Category> {
    CATEGORY_RULES
        .iter()
        .filter(|rule| rule.pattern.is_match(text))
        .map(|rule| rule.tag)
        .collect()
}

fn extract_amount(text: &str) -> Option<f64> {
    let digits = AMOUNT.captures(text)?.get(1)?.as_str().replace(',', "");
    digits.parse().ok()
}

/// Describes, in one line, what will be done to answer the query.
pub(crate) fn suggest_response(intent: &QueryIntent) -> String {
    match intent.kind {
        IntentType::Balance => {
            "I'll check your account balances and overall net worth.".to_string()
        }
        IntentType::Spending if !intent.categories.is_empty() => {
            let categories = intent
                .categories
                .iter()
                .map(|category| category.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let timeframe = intent
                .timeframe
                .unwrap_or(DEFAULT_TIMEFRAME)
                .as_str()
                .replace('_', " ");
            format!("I'll analyze your {categories} spending ({timeframe}).")
        }
        IntentType::Spending => {
            "I'll break down your spending by category to show where your money goes.".to_string()
        }
        IntentType::Income => "I'll review your income sources and earnings.".to_string(),
        IntentType::Budget => {
            "I'll check how your spending is tracking against your budgets.".to_string()
        }
        IntentType::Comparison => match intent.comparison {
            Some(ComparisonBaseline::LastMonth) => {
                "I'll compare this month's finances with last month.".to_string()
            }
            _ => "I'll compare your income against your expenses.".to_string(),
        },
        IntentType::Forecast => {
            "I'll project your upcoming finances from your recent activity.".to_string()
        }
        IntentType::Goals => "I'll check your progress toward your savings goals.".to_string(),
        IntentType::Debt => "I'll summarize your outstanding debts and what you owe.".to_string(),
        IntentType::General => GENERAL_HELP.to_string(),
    }
}

const GENERAL_HELP: &str = "I can help with balances, spending, income, budgets, \
    comparisons, forecasts, savings goals, and debt. What would you like to know?";

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_no_details(intent: &QueryIntent) {
        assert_eq!(intent.timeframe, None);
        assert!(intent.categories.is_empty());
        assert_eq!(intent.operation, None);
        assert_eq!(intent.comparison, None);
        assert_eq!(intent.amount, None);
    }

    #[test]
    fn intent_priority_order() {
        let order: Vec<_> = INTENT_RULES.iter().map(|rule| rule.tag).collect();
        assert_eq!(
            order,
            vec![
                IntentType::Comparison,
                IntentType::Forecast,
                IntentType::Income,
                IntentType::Debt,
                IntentType::Balance,
                IntentType::Spending,
                IntentType::Budget,
                IntentType::Goals,
            ]
        );
    }

    #[test]
    fn food_spending_last_month() {
        let processed = process_query("How much did I spend on food last month?");
        let intent = &processed.intent;
        assert_eq!(intent.kind, IntentType::Spending);
        assert_eq!(intent.categories, vec![Category::Food]);
        assert_eq!(intent.timeframe, Some(Timeframe::LastMonth));
        assert_eq!(intent.comparison, None);
        assert_eq!(intent.operation, Some(Operation::Total));
        assert_eq!(processed.confidence, 0.9);
        assert!(processed.suggested_response.contains("food"));
        assert!(processed.suggested_response.contains("last month"));
    }

    #[test]
    fn total_account_balance() {
        let processed = process_query("What's my total account balance?");
        assert_eq!(processed.intent.kind, IntentType::Balance);
        assert_eq!(processed.intent.operation, Some(Operation::Total));
        assert_eq!(processed.confidence, 0.9);
    }

    #[test]
    fn compare_this_month_with_last_month() {
        let processed = process_query("Compare my spending this month vs last month");
        let intent = &processed.intent;
        assert_eq!(intent.kind, IntentType::Comparison);
        assert_eq!(intent.comparison, Some(ComparisonBaseline::LastMonth));
        assert_eq!(intent.timeframe, Some(Timeframe::Month));
        assert_eq!(
            processed.suggested_response,
            "I'll compare this month's finances with last month."
        );
    }

    #[test]
    fn comparison_baseline_without_spending_words() {
        let intent = process_query("compare this month vs last month").intent;
        assert_eq!(intent.comparison, Some(ComparisonBaseline::LastMonth));
    }

    #[test]
    fn gibberish_falls_back_to_general() {
        let processed = process_query("xyz123 random gibberish");
        assert_eq!(processed.intent.kind, IntentType::General);
        assert_eq!(processed.confidence, 0.3);
        assert_no_details(&processed.intent);
    }

    #[test]
    fn amount_with_separators() {
        let intent = process_query("Did I spend $1,234.56 on shopping this quarter?").intent;
        assert_eq!(intent.kind, IntentType::Spending);
        assert_eq!(intent.amount, Some(1234.56));
        assert_eq!(intent.categories, vec![Category::Shopping]);
        assert_eq!(intent.timeframe, Some(Timeframe::Quarter));
    }

    #[test]
    fn empty_and_blank_queries() {
        for text in ["", "   \t\n "] {
            let processed = process_query(text);
            assert_eq!(processed.intent.kind, IntentType::General);
            assert_eq!(processed.confidence, 0.3);
            assert_eq!(processed.suggested_response, GENERAL_HELP);
            assert_eq!(processed.original_query, text);
            assert_no_details(&processed.intent);
        }
    }

    #[test]
    fn only_first_amount_is_used() {
        let intent = process_query("I spent $50 and got $20 back").intent;
        assert_eq!(intent.amount, Some(50.0));
    }

    #[test]
    fn month_never_shadows_last_month() {
        let cases = [
            ("spending last month", Some(Timeframe::LastMonth)),
            ("spending in the previous month", Some(Timeframe::LastMonth)),
            ("spending this month", Some(Timeframe::Month)),
            ("my monthly spending", Some(Timeframe::Month)),
            ("spending in the month of may", None),
        ];
        for (text, expected) in cases {
            assert_eq!(process_query(text).intent.timeframe, expected, "{text}");
        }
    }

    #[test]
    fn date_tokens_are_custom_timeframes() {
        assert_eq!(
            process_query("spending since 2024-03-01").intent.timeframe,
            Some(Timeframe::Custom)
        );
        assert_eq!(
            process_query("spending after 3/1/2024").intent.timeframe,
            Some(Timeframe::Custom)
        );
        assert_eq!(process_query("spending").intent.timeframe, None);
    }

    #[test]
    fn categories_keep_vocabulary_order() {
        let intent = process_query("Gym, Uber and restaurant spending").intent;
        assert_eq!(
            intent.categories,
            vec![Category::Food, Category::Transport, Category::Health]
        );
        assert_eq!(
            process_query("food and transport spending").suggested_response,
            "I'll analyze your food, transport spending (month)."
        );
    }

    #[test]
    fn comparison_baseline_needs_a_cue() {
        let cases = [
            ("income compared to last year", Some(ComparisonBaseline::LastYear)),
            ("am i over budget on dining", Some(ComparisonBaseline::Budget)),
            ("spending versus my savings goal", Some(ComparisonBaseline::Goal)),
            ("month-over-month spending", Some(ComparisonBaseline::LastMonth)),
            ("what did i earn last year", None),
        ];
        for (text, expected) in cases {
            assert_eq!(process_query(text).intent.comparison, expected, "{text}");
        }
    }

    #[test]
    fn operations() {
        let cases = [
            ("average grocery bill per week", Some(Operation::Average)),
            ("how many times did i eat out", Some(Operation::Count)),
            ("spending trend this year", Some(Operation::Trend)),
            ("expenses by category", Some(Operation::Breakdown)),
            ("spending", None),
        ];
        for (text, expected) in cases {
            assert_eq!(process_query(text).intent.operation, expected, "{text}");
        }
    }

    #[test]
    fn digits_inside_words_are_not_amounts() {
        assert_eq!(process_query("account abc42").intent.amount, None);
        assert_eq!(process_query("rent of 1,200 dollars").intent.amount, Some(1200.0));
    }

    #[test]
    fn amounts_with_suffixes_and_short_fractions() {
        assert_eq!(process_query("is $10k enough").intent.amount, Some(10.0));
        assert_eq!(process_query("spent $5.5 on coffee").intent.amount, Some(5.5));
        assert_eq!(process_query("xyz123 random gibberish").intent.amount, None);
    }

    #[test]
    fn compared_to_is_a_comparison() {
        let processed = process_query("spending compared to last month");
        assert_eq!(processed.intent.kind, IntentType::Comparison);
        assert_eq!(
            processed.intent.comparison,
            Some(ComparisonBaseline::LastMonth)
        );
        assert_eq!(
            processed.suggested_response,
            "I'll compare this month's finances with last month."
        );

        for text in [
            "income compared to last year",
            "how does food compare with bills",
            "compares my rent to my budget",
        ] {
            assert_eq!(process_query(text).intent.kind, IntentType::Comparison, "{text}");
        }
    }

    #[test]
    fn previous_periods_other_than_last_month_are_absent() {
        let cases = [
            ("how much did i earn last year", None),
            ("spending in the past year", None),
            ("spending last week", None),
            ("spending over the past week", None),
            ("spending last quarter", None),
            ("spending in q2", None),
            ("spending this week", Some(Timeframe::Week)),
            ("spending this year", Some(Timeframe::Year)),
            ("income ytd", Some(Timeframe::Year)),
            ("quarterly spending", Some(Timeframe::Quarter)),
        ];
        for (text, expected) in cases {
            assert_eq!(process_query(text).intent.timeframe, expected, "{text}");
        }
    }

    #[test]
    fn upper_case_input_matches() {
        let intent = process_query("WHAT IS MY NET WORTH").intent;
        assert_eq!(intent.kind, IntentType::Balance);
    }

    #[test]
    fn non_english_input_is_general() {
        let processed = process_query("이번 달 지출은 얼마야?");
        assert_eq!(processed.intent.kind, IntentType::General);
        assert_eq!(processed.confidence, 0.3);
    }

    #[test]
    fn overlong_input_is_truncated_before_matching() {
        let text = format!("{} what is my balance", "x".repeat(MAX_QUERY_CHARS));
        let processed = process_query(&text);
        assert_eq!(processed.intent.kind, IntentType::General);
        assert_eq!(processed.original_query, text);
    }

    #[test]
    fn classification_is_deterministic() {
        for text in EXAMPLE_QUERIES {
            let first = process_query(text);
            let second = process_query(text);
            assert_eq!(first, second);
            assert!(first.confidence == 0.9 || first.confidence == 0.3);
            let mut sorted = first.intent.categories.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted, first.intent.categories);
        }
    }

    #[test]
    fn every_example_query_hits_an_intent_rule() {
        for text in EXAMPLE_QUERIES {
            assert_ne!(process_query(text).intent.kind, IntentType::General, "{text}");
        }
    }

    #[test]
    fn templates_per_intent() {
        let intent = |kind| QueryIntent {
            kind,
            timeframe: None,
            categories: Vec::new(),
            operation: None,
            comparison: None,
            amount: None,
        };
        assert_eq!(
            suggest_response(&intent(IntentType::Comparison)),
            "I'll compare your income against your expenses."
        );
        assert_eq!(
            suggest_response(&intent(IntentType::Spending)),
            "I'll break down your spending by category to show where your money goes."
        );
        let mut spending = intent(IntentType::Spending);
        spending.categories = vec![Category::Bills];
        spending.timeframe = Some(Timeframe::LastMonth);
        assert_eq!(
            suggest_response(&spending),
            "I'll analyze your bills spending (last month)."
        );
        assert_eq!(suggest_response(&intent(IntentType::General)), GENERAL_HELP);
    }
}
