use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use claim_core::calculations::common::{MAX_AMOUNT, percent_of, within_tolerance};
use claim_core::calculations::rates::MAX_RATE_PERCENT;
use claim_core::calculations::{
    ClaimItemInput, CreditInput, ItemizedClaimInput, ItemizedClaimWorksheet, LineItemAggregator,
    ProjectRates, SimpleClaimCalculator, SimpleClaimInput, SimpleClaimWorksheet, VariationInput,
};
use claim_core::db::MemoryRepository;
use claim_core::input::{ClaimHeaderForm, SimpleClaimForm};
use claim_core::submission::ClaimSubmitter;
use claim_core::{ClaimRepository, NewProject};

fn item(
    description: &str,
    contract_value: Decimal,
    percent_complete: Decimal,
) -> ClaimItemInput {
    ClaimItemInput {
        description: description.to_string(),
        contract_value,
        percent_complete,
    }
}

fn schedule() -> Vec<ClaimItemInput> {
    vec![
        item("Preliminaries", dec!(48250.55), dec!(100)),
        item("Earthworks", dec!(120000), dec!(62.5)),
        item("Concrete", dec!(333333.33), dec!(33.33)),
        item("Steel", dec!(99999.99), dec!(12.345)),
        item("Roofing", dec!(72500), dec!(0)),
    ]
}

#[test]
fn every_item_splits_into_claimed_and_left() {
    let totals = LineItemAggregator.aggregate(&schedule(), &[], &[]);

    for line in &totals.items {
        assert_eq!(
            line.this_claim + line.left_to_claim,
            line.contract_value,
            "{}",
            line.description
        );
    }
}

#[test]
fn rounded_total_stays_within_a_cent_of_the_exact_sum() {
    let items = schedule();
    let exact: Decimal = items
        .iter()
        .map(|item| percent_of(item.contract_value, item.percent_complete))
        .sum();

    let totals = LineItemAggregator.aggregate(&items, &[], &[]);

    assert!(
        within_tolerance(totals.total_works_completed, exact),
        "{} vs {exact}",
        totals.total_works_completed
    );
}

#[test]
fn many_half_cent_rows_do_not_drift() {
    let items = vec![item("Fixings", dec!(0.01), dec!(50)); 1000];
    let variations = vec![
        VariationInput {
            description: "Thirds".to_string(),
            quantity: dec!(1),
            rate: dec!(0.0033333),
        };
        3000
    ];

    let totals = LineItemAggregator.aggregate(&items, &variations, &[]);

    // Stored rows show 0.01 and 0.00; the exact sums are 5.000 and 9.9999.
    assert_eq!(totals.items[999].this_claim, dec!(0.01));
    assert_eq!(totals.total_works_completed, dec!(5.00));
    assert_eq!(totals.variations[0].variation_value, dec!(0.00));
    assert_eq!(totals.total_variations, dec!(10.00));
}

#[test]
fn totals_track_the_exact_sum_as_rows_grow() {
    for rows in [1, 7, 64, 513, 4096] {
        let items: Vec<ClaimItemInput> = (0..rows)
            .map(|i| item("Row", Decimal::new(1234 + i, 2), dec!(33.33)))
            .collect();
        let exact: Decimal = items
            .iter()
            .map(|item| percent_of(item.contract_value, item.percent_complete))
            .sum();

        let total = LineItemAggregator
            .aggregate(&items, &[], &[])
            .total_works_completed;

        assert!(within_tolerance(total, exact), "{rows} rows: {total} vs {exact}");
    }
}

#[test]
fn largest_accepted_values_calculate_without_overflow() {
    let rates = ProjectRates::from_percentages(MAX_RATE_PERCENT, MAX_RATE_PERCENT).unwrap();

    let simple = SimpleClaimWorksheet::new(MAX_AMOUNT, rates).calculate(&SimpleClaimInput {
        percent_complete: dec!(100),
        previous_claim: -MAX_AMOUNT,
    });
    assert_eq!(simple.this_claim, MAX_AMOUNT * dec!(2));
    assert_eq!(simple.gst, MAX_AMOUNT * dec!(20));

    let input = ItemizedClaimInput {
        items: vec![item("Works", MAX_AMOUNT, dec!(100)); 100],
        variations: vec![
            VariationInput {
                description: "Extra".to_string(),
                quantity: dec!(1),
                rate: MAX_AMOUNT,
            };
            100
        ],
        credits: vec![
            CreditInput {
                description: "Contra".to_string(),
                amount: -MAX_AMOUNT,
            };
            100
        ],
        payment_received: -MAX_AMOUNT,
    };

    let result = ItemizedClaimWorksheet::new(rates).calculate(&input);

    assert_eq!(result.sub_total, MAX_AMOUNT * dec!(301));
    assert_eq!(result.total_inc_gst, MAX_AMOUNT * dec!(3311));
}

#[test]
fn form_values_past_the_limit_never_reach_the_worksheet() {
    let form = SimpleClaimForm {
        header: ClaimHeaderForm::new("PC-99"),
        percent_complete: "50".to_string(),
        previous_claim: "100000000000000000000".to_string(),
    };

    let err = form.validate().unwrap_err();

    assert_eq!(err.fields().collect::<Vec<_>>(), vec!["previous_claim"]);
}

#[test]
fn item_order_does_not_change_totals() {
    let forward = schedule();
    let mut reversed = schedule();
    reversed.reverse();
    let mut rotated = schedule();
    rotated.rotate_left(2);

    let expected = LineItemAggregator
        .aggregate(&forward, &[], &[])
        .total_works_completed;

    for items in [reversed, rotated] {
        assert_eq!(
            LineItemAggregator.aggregate(&items, &[], &[]).total_works_completed,
            expected
        );
    }
}

#[test]
fn simple_scenario_matches_worked_example() {
    let result = SimpleClaimWorksheet::new(dec!(1500000), ProjectRates::default()).calculate(
        &SimpleClaimInput {
            percent_complete: dec!(75),
            previous_claim: dec!(0),
        },
    );

    assert_eq!(
        [
            result.contract_work,
            result.this_claim,
            result.gst,
            result.total_inc_gst,
            result.retention_held,
            result.amount_due,
        ],
        [
            dec!(1125000),
            dec!(1125000),
            dec!(112500),
            dec!(1237500),
            dec!(56250),
            dec!(1181250),
        ]
    );
}

#[test]
fn itemized_scenario_matches_worked_example() {
    let input = ItemizedClaimInput {
        items: vec![
            item("A", dec!(500000), dec!(100)),
            item("B", dec!(300000), dec!(50)),
        ],
        ..Default::default()
    };

    let result = ItemizedClaimWorksheet::new(ProjectRates::default()).calculate(&input);

    assert_eq!(result.total_works_completed(), dec!(650000));
    assert_eq!(result.sub_total, dec!(650000));
    assert_eq!(result.gst, dec!(65000));
    assert_eq!(result.total_inc_gst, dec!(715000));
}

#[test]
fn credits_beyond_works_give_negative_totals() {
    let input = ItemizedClaimInput {
        items: vec![item("Works", dec!(100000), dec!(100))],
        credits: vec![CreditInput {
            description: "Contra charge".to_string(),
            amount: dec!(150000),
        }],
        ..Default::default()
    };

    let result = ItemizedClaimWorksheet::new(ProjectRates::default()).calculate(&input);

    assert_eq!(result.sub_total, dec!(-50000));
    assert_eq!(result.gst, dec!(-5000));
    assert_eq!(result.total_inc_gst, dec!(-55000));
}

#[test]
fn recalculating_the_same_input_gives_the_same_result() {
    let worksheet = ItemizedClaimWorksheet::new(ProjectRates::default());
    let input = ItemizedClaimInput {
        items: schedule(),
        variations: vec![VariationInput {
            description: "Extra excavation".to_string(),
            quantity: dec!(13.5),
            rate: dec!(87.25),
        }],
        credits: vec![],
        payment_received: dec!(25000),
    };

    let first = worksheet.calculate(&input);
    for _ in 0..3 {
        assert_eq!(worksheet.calculate(&input), first);
    }
}

#[tokio::test]
async fn submitted_simple_claim_reads_back_identically() {
    let repo = MemoryRepository::new();
    let project = repo
        .create_project(NewProject::new("Distribution centre", dec!(1500000)))
        .await
        .unwrap();
    let submitter = ClaimSubmitter::new(&repo);
    let form = SimpleClaimForm {
        header: ClaimHeaderForm::new("PC-07"),
        percent_complete: "75".to_string(),
        previous_claim: "750,000".to_string(),
    };

    let (prepared, _) = submitter.prepare_simple(project.id, &form).await.unwrap();
    let submitted = submitter.submit(prepared).await.unwrap();
    let stored = repo.get_claim(submitted.claim.id).await.unwrap();

    assert_eq!(stored.this_claim, dec!(375000));
    assert_eq!(stored.amount_due, dec!(393750));
    assert_eq!(stored.amount_due.to_string(), "393750.00");
    assert_eq!(stored, submitted.claim);
}

#[tokio::test]
async fn live_calculator_tracks_the_stored_project() {
    let repo = MemoryRepository::new();
    let mut new_project = NewProject::new("Cold store", dec!(1500000));
    new_project.retention_rate = dec!(2.50);
    let project = repo.create_project(new_project).await.unwrap();

    let mut calc = SimpleClaimCalculator::for_project(&project).unwrap();
    calc.set_percent_complete(Some(dec!(40)));
    calc.set_previous_claim(dec!(200000));
    let live = calc.draft().result.unwrap();

    let rates = ProjectRates::for_project(&project).unwrap();
    let direct = SimpleClaimWorksheet::new(project.total_value, rates).calculate(
        &SimpleClaimInput {
            percent_complete: dec!(40),
            previous_claim: dec!(200000),
        },
    );

    assert_eq!(live, direct);
    assert_eq!(live.this_claim, dec!(400000));
    assert_eq!(live.retention_held, dec!(10000));
    assert_eq!(live.amount_due, dec!(430000));
}
