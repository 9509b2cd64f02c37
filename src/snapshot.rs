//! Figures gathered from the database to ground an answer to a classified
//! query. Which figures are gathered depends only on the [`QueryIntent`].

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use crate::{
    database::{Account, AccountKind, Budget, Database, Goal, Transaction, UserId},
    query::{
        Category, ComparisonBaseline, IntentType, Operation, QueryIntent, Timeframe,
        DEFAULT_TIMEFRAME,
    },
};

const FORECAST_MONTHS: u32 = 3;
const TREND_MONTHS: u32 = 6;

/// A half-open date range: `start` is included, `end` is not.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct Period {
    pub(crate) start: NaiveDate,
    pub(crate) end: NaiveDate,
}

impl Period {
    /// Resolves `timeframe` against `today`. `all` and `custom` are
    /// unbounded and yield `None`.
    pub(crate) fn of(timeframe: Timeframe, today: NaiveDate) -> Option<Period> {
        let (year, month) = (today.year(), today.month());
        match timeframe {
            Timeframe::Today => Some(Period {
                start: today,
                end: today + Days::new(1),
            }),
            Timeframe::Week => {
                let start =
                    today - Days::new(today.weekday().num_days_from_monday().into());
                Some(Period {
                    start,
                    end: start + Days::new(7),
                })
            }
            Timeframe::Month => Some(Period::month(year, month)),
            Timeframe::LastMonth => {
                let (year, month) = shift_month(year, month, -1);
                Some(Period::month(year, month))
            }
            Timeframe::Quarter => {
                let first = today.month0() / 3 * 3 + 1;
                Some(Period {
                    start: month_start(year, first),
                    end: Period::month(year, first + 2).end,
                })
            }
            Timeframe::Year => Some(Period {
                start: month_start(year, 1),
                end: month_start(year + 1, 1),
            }),
            Timeframe::All | Timeframe::Custom => None,
        }
    }

    fn month(year: i32, month: u32) -> Period {
        let (next_year, next_month) = shift_month(year, month, 1);
        Period {
            start: month_start(year, month),
            end: month_start(next_year, next_month),
        }
    }

    pub(crate) fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

fn month_start(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).expect("month is within 1..=12")
}

fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

fn within(period: Option<Period>, date: NaiveDate) -> bool {
    period.is_none_or(|period| period.contains(date))
}

/// Whether `txn` falls in one of `categories`; an empty list matches all.
fn in_categories(txn: &Transaction, categories: &[Category]) -> bool {
    categories.is_empty()
        || txn
            .category
            .is_some_and(|category| categories.contains(&category))
}

fn cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, PartialEq, Serialize)]
pub(crate) struct AccountBalance {
    pub(crate) name: String,
    pub(crate) kind: AccountKind,
    pub(crate) balance: f64,
}

impl From<&Account> for AccountBalance {
    fn from(account: &Account) -> Self {
        Self {
            name: account.name.clone(),
            kind: account.kind,
            balance: cents(account.balance),
        }
    }
}

/// Money in and out over a period.
#[derive(Debug, PartialEq, Serialize)]
pub(crate) struct Flow {
    pub(crate) period: Option<Period>,
    pub(crate) income: f64,
    pub(crate) expenses: f64,
    pub(crate) net: f64,
}

impl Flow {
    fn over(transactions: &[Transaction], period: Option<Period>) -> Flow {
        let (income, expenses) = transactions
            .iter()
            .filter(|txn| within(period, txn.date))
            .fold((0.0, 0.0), |(income, expenses), txn| {
                if txn.is_expense {
                    (income, expenses + txn.amount)
                } else {
                    (income + txn.amount, expenses)
                }
            });
        Flow {
            period,
            income: cents(income),
            expenses: cents(expenses),
            net: cents(income - expenses),
        }
    }
}

#[derive(Debug, PartialEq, Serialize)]
pub(crate) struct CategoryTotal {
    /// `None` collects uncategorized transactions.
    pub(crate) category: Option<Category>,
    pub(crate) total: f64,
}

#[derive(Debug, PartialEq, Serialize)]
pub(crate) struct MonthTotal {
    /// `YYYY-MM`
    pub(crate) month: String,
    pub(crate) total: f64,
}

#[derive(Debug, PartialEq, Serialize)]
pub(crate) struct SpendingSummary {
    pub(crate) period: Option<Period>,
    /// Categories the summary is restricted to; empty means all.
    pub(crate) categories: Vec<Category>,
    pub(crate) total: f64,
    pub(crate) count: usize,
    pub(crate) average: Option<f64>,
    pub(crate) by_category: Vec<CategoryTotal>,
    /// Filled only for trend questions.
    pub(crate) monthly: Vec<MonthTotal>,
}

#[derive(Debug, PartialEq, Serialize)]
pub(crate) struct BudgetStatus {
    pub(crate) category: Option<Category>,
    pub(crate) limit: f64,
    pub(crate) spent: f64,
    pub(crate) remaining: f64,
    pub(crate) over_budget: bool,
}

#[derive(Debug, PartialEq, Serialize)]
pub(crate) struct GoalProgress {
    pub(crate) name: String,
    pub(crate) target: f64,
    pub(crate) saved: f64,
    pub(crate) remaining: f64,
    /// `saved / target`, may exceed 1.
    pub(crate) progress: f64,
    pub(crate) deadline: Option<NaiveDate>,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum Snapshot {
    Balance {
        accounts: Vec<AccountBalance>,
        net_worth: f64,
    },
    Spending(SpendingSummary),
    Income {
        period: Option<Period>,
        total: f64,
        count: usize,
    },
    Budget {
        statuses: Vec<BudgetStatus>,
    },
    PeriodComparison {
        /// Categories both flows are restricted to; empty means all.
        categories: Vec<Category>,
        current: Flow,
        baseline: Flow,
    },
    IncomeVsExpenses(Flow),
    Forecast {
        months_sampled: u32,
        average_income: f64,
        average_expenses: f64,
        projected_net: f64,
        projected_net_worth: f64,
    },
    Goals {
        goals: Vec<GoalProgress>,
    },
    Debt {
        accounts: Vec<AccountBalance>,
        total_owed: f64,
    },
    Overview {
        net_worth: f64,
        this_month: Flow,
    },
}

impl Snapshot {
    pub(crate) fn collect(
        db: &Database,
        user: UserId,
        intent: &QueryIntent,
        today: NaiveDate,
    ) -> Result<Snapshot> {
        let period = Period::of(intent.timeframe.unwrap_or(DEFAULT_TIMEFRAME), today);
        let snapshot = match intent.kind {
            IntentType::Balance => balances(&db.accounts(user)?),
            IntentType::Spending => Snapshot::Spending(spending(
                &db.transactions(user)?,
                intent,
                period,
                today,
            )),
            IntentType::Income => income(&db.transactions(user)?, period),
            IntentType::Budget => budget_status(&db.budgets(user)?, &db.transactions(user)?, today),
            IntentType::Comparison => match intent.comparison {
                Some(ComparisonBaseline::LastMonth) => period_comparison(
                    &db.transactions(user)?,
                    &intent.categories,
                    Period::of(Timeframe::Month, today),
                    Period::of(Timeframe::LastMonth, today),
                ),
                Some(ComparisonBaseline::LastYear) => period_comparison(
                    &db.transactions(user)?,
                    &intent.categories,
                    Period::of(Timeframe::Year, today),
                    Some(Period {
                        start: month_start(today.year() - 1, 1),
                        end: month_start(today.year(), 1),
                    }),
                ),
                Some(ComparisonBaseline::Budget) => {
                    budget_status(&db.budgets(user)?, &db.transactions(user)?, today)
                }
                Some(ComparisonBaseline::Goal) => goal_progress(&db.goals(user)?),
                None => Snapshot::IncomeVsExpenses(Flow::over(&db.transactions(user)?, period)),
            },
            IntentType::Forecast => {
                forecast(&db.accounts(user)?, &db.transactions(user)?, today)
            }
            IntentType::Goals => goal_progress(&db.goals(user)?),
            IntentType::Debt => debts(&db.accounts(user)?),
            IntentType::General => Snapshot::Overview {
                net_worth: net_worth(&db.accounts(user)?),
                this_month: Flow::over(
                    &db.transactions(user)?,
                    Period::of(Timeframe::Month, today),
                ),
            },
        };
        Ok(snapshot)
    }
}

fn net_worth(accounts: &[Account]) -> f64 {
    cents(accounts.iter().map(|account| account.balance).sum())
}

fn balances(accounts: &[Account]) -> Snapshot {
    Snapshot::Balance {
        accounts: accounts.iter().map(AccountBalance::from).collect(),
        net_worth: net_worth(accounts),
    }
}

fn spending(
    transactions: &[Transaction],
    intent: &QueryIntent,
    period: Option<Period>,
    today: NaiveDate,
) -> SpendingSummary {
    let in_scope =
        |txn: &&Transaction| txn.is_expense && in_categories(txn, &intent.categories);
    let expenses: Vec<&Transaction> = transactions
        .iter()
        .filter(in_scope)
        .filter(|txn| within(period, txn.date))
        .collect();

    let total: f64 = expenses.iter().map(|txn| txn.amount).sum();
    let count = expenses.len();
    let by_category = expenses
        .iter()
        .fold(BTreeMap::new(), |mut acc, txn| {
            *acc.entry(txn.category).or_insert(0.0) += txn.amount;
            acc
        })
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category,
            total: cents(total),
        })
        .collect();

    let monthly = if intent.operation == Some(Operation::Trend) {
        (0..TREND_MONTHS)
            .rev()
            .map(|back| {
                let (year, month) = shift_month(today.year(), today.month(), -(back as i32));
                let range = Period::month(year, month);
                let total = transactions
                    .iter()
                    .filter(in_scope)
                    .filter(|txn| range.contains(txn.date))
                    .map(|txn| txn.amount)
                    .sum::<f64>();
                MonthTotal {
                    month: format!("{year:04}-{month:02}"),
                    total: cents(total),
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    SpendingSummary {
        period,
        categories: intent.categories.clone(),
        total: cents(total),
        count,
        average: (count > 0).then(|| cents(total / count as f64)),
        by_category,
        monthly,
    }
}

fn income(transactions: &[Transaction], period: Option<Period>) -> Snapshot {
    let earned: Vec<f64> = transactions
        .iter()
        .filter(|txn| !txn.is_expense && within(period, txn.date))
        .map(|txn| txn.amount)
        .collect();
    Snapshot::Income {
        period,
        total: cents(earned.iter().sum()),
        count: earned.len(),
    }
}

fn budget_status(budgets: &[Budget], transactions: &[Transaction], today: NaiveDate) -> Snapshot {
    let month = Period::month(today.year(), today.month());
    let statuses = budgets
        .iter()
        .map(|budget| {
            let spent: f64 = transactions
                .iter()
                .filter(|txn| txn.is_expense && month.contains(txn.date))
                .filter(|txn| budget.category.is_none() || txn.category == budget.category)
                .map(|txn| txn.amount)
                .sum();
            BudgetStatus {
                category: budget.category,
                limit: cents(budget.limit),
                spent: cents(spent),
                remaining: cents(budget.limit - spent),
                over_budget: spent > budget.limit,
            }
        })
        .collect();
    Snapshot::Budget { statuses }
}

fn period_comparison(
    transactions: &[Transaction],
    categories: &[Category],
    current: Option<Period>,
    baseline: Option<Period>,
) -> Snapshot {
    let transactions: Vec<Transaction> = transactions
        .iter()
        .filter(|txn| in_categories(txn, categories))
        .cloned()
        .collect();
    Snapshot::PeriodComparison {
        categories: categories.to_vec(),
        current: Flow::over(&transactions, current),
        baseline: Flow::over(&transactions, baseline),
    }
}

/// Projects next month from the average of the last complete months.
fn forecast(accounts: &[Account], transactions: &[Transaction], today: NaiveDate) -> Snapshot {
    let (income, expenses) = (1..=FORECAST_MONTHS).fold((0.0, 0.0), |(income, expenses), back| {
        let (year, month) = shift_month(today.year(), today.month(), -(back as i32));
        let flow = Flow::over(transactions, Some(Period::month(year, month)));
        (income + flow.income, expenses + flow.expenses)
    });
    let months = f64::from(FORECAST_MONTHS);
    let projected_net = (income - expenses) / months;
    Snapshot::Forecast {
        months_sampled: FORECAST_MONTHS,
        average_income: cents(income / months),
        average_expenses: cents(expenses / months),
        projected_net: cents(projected_net),
        projected_net_worth: cents(net_worth(accounts) + projected_net),
    }
}

fn goal_progress(goals: &[Goal]) -> Snapshot {
    let goals = goals
        .iter()
        .map(|goal| GoalProgress {
            name: goal.name.clone(),
            target: cents(goal.target),
            saved: cents(goal.saved),
            remaining: cents((goal.target - goal.saved).max(0.0)),
            progress: (goal.saved / goal.target * 1000.0).round() / 1000.0,
            deadline: goal.deadline,
        })
        .collect();
    Snapshot::Goals { goals }
}

fn debts(accounts: &[Account]) -> Snapshot {
    let liabilities: Vec<&Account> = accounts
        .iter()
        .filter(|account| account.kind.is_liability())
        .collect();
    let total_owed: f64 = liabilities
        .iter()
        .map(|account| (-account.balance).max(0.0))
        .sum();
    Snapshot::Debt {
        accounts: liabilities.into_iter().map(AccountBalance::from).collect(),
        total_owed: cents(total_owed),
    }
}
