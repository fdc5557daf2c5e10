//! Plain text reports printed by the command line tool.

use std::fmt;

use chrono::{DateTime, Utc};
use claim_core::calculations::{ItemizedClaimResult, SimpleClaimResult};
use claim_core::{
    Attachment, Claim, ClaimItem, ClaimKind, Credit, Project, RetentionSchedule, Variation,
};
use rust_decimal::Decimal;

fn date(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string())
}

fn text(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn percent(value: Option<Decimal>) -> String {
    value.map_or_else(|| "-".to_string(), |p| format!("{p}%"))
}

pub struct ProjectTable<'a>(pub &'a [Project]);

impl fmt::Display for ProjectTable<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No projects.");
        }
        writeln!(
            f,
            "{:>5}  {:<30} {:>16} {:>7} {:>11}  {}",
            "ID", "Name", "Contract value", "GST %", "Retention %", "Status"
        )?;
        for p in self.0 {
            writeln!(
                f,
                "{:>5}  {:<30} {:>16} {:>7} {:>11}  {}",
                p.id,
                p.name,
                p.total_value,
                p.gst_rate,
                p.retention_rate,
                p.status.as_str()
            )?;
        }
        Ok(())
    }
}

pub struct ProjectDetail<'a> {
    pub project: &'a Project,
    pub claims: &'a [Claim],
}

impl fmt::Display for ProjectDetail<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let p = self.project;
        writeln!(f, "Project {}: {}", p.id, p.name)?;
        writeln!(f, "Description:     {}", text(p.description.as_deref()))?;
        writeln!(f, "Contract value:  {}", p.total_value)?;
        writeln!(f, "GST rate:        {}%", p.gst_rate)?;
        writeln!(f, "Retention rate:  {}%", p.retention_rate)?;
        writeln!(f, "Status:          {}", p.status.as_str())?;
        let r = &p.retention_schedule;
        if *r != RetentionSchedule::default() {
            writeln!(f, "Retention schedule:")?;
            writeln!(f, "  Per claim:       {}", percent(r.per_claim_percent))?;
            writeln!(f, "  Collect until:   {}", percent(r.collect_until_percent))?;
            writeln!(
                f,
                "  First release:   {} {}",
                percent(r.first_release_percent),
                text(r.first_release_timing.as_deref())
            )?;
            writeln!(
                f,
                "  Final release:   {} {}",
                percent(r.final_release_percent),
                text(r.final_release_timing.as_deref())
            )?;
            match r.dlp_months {
                Some(months) => writeln!(f, "  DLP:             {months} months")?,
                None => writeln!(f, "  DLP:             -")?,
            }
        }
        writeln!(f)?;
        write!(f, "{}", ClaimTable(self.claims))
    }
}

pub struct ClaimTable<'a>(pub &'a [Claim]);

impl fmt::Display for ClaimTable<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No claims.");
        }
        writeln!(
            f,
            "{:>5} {:>7}  {:<12} {:<9} {:<9} {:<12} {:>16} {:>16}",
            "ID", "Project", "Number", "Kind", "Status", "Month ending", "Total inc GST", "Amount due"
        )?;
        for c in self.0 {
            writeln!(
                f,
                "{:>5} {:>7}  {:<12} {:<9} {:<9} {:<12} {:>16} {:>16}",
                c.id,
                c.project_id,
                c.number,
                c.kind.as_str(),
                c.status.as_str(),
                date(c.month_ending),
                c.total_inc_gst,
                c.amount_due
            )?;
        }
        Ok(())
    }
}

/// A stored claim with everything recorded against it.
pub struct ClaimDetail<'a> {
    pub claim: &'a Claim,
    pub items: &'a [ClaimItem],
    pub variations: &'a [Variation],
    pub credits: &'a [Credit],
    pub attachments: &'a [Attachment],
}

impl fmt::Display for ClaimDetail<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let c = self.claim;
        writeln!(f, "Claim {} ({}) for project {}", c.number, c.kind.as_str(), c.project_id)?;
        writeln!(f, "Status:                {}", c.status.as_str())?;
        writeln!(f, "Month ending:          {}", date(c.month_ending))?;
        writeln!(f, "Contact:               {}", text(c.contact_person.as_deref()))?;
        writeln!(f, "Subcontract reference: {}", text(c.subcontract_reference.as_deref()))?;
        writeln!(f, "Description:           {}", text(c.description.as_deref()))?;
        writeln!(f)?;

        match c.kind {
            ClaimKind::Simple => {
                writeln!(f, "Percent complete:      {}%", c.percent_complete)?;
                writeln!(f, "Contract work to date: {:>16}", c.total_works_completed)?;
                writeln!(f, "Previous claims:       {:>16}", c.previous_claim)?;
                writeln!(f, "This claim (ex GST):   {:>16}", c.this_claim)?;
                writeln!(f, "GST:                   {:>16}", c.gst)?;
                writeln!(f, "Total inc GST:         {:>16}", c.total_inc_gst)?;
                writeln!(f, "Retention held:        {:>16}", c.retention_held)?;
                writeln!(f, "Amount due:            {:>16}", c.amount_due)?;
            }
            ClaimKind::Itemized => {
                write_stored_items(f, self.items)?;
                write_stored_variations(f, self.variations)?;
                write_stored_credits(f, self.credits)?;
                writeln!(f, "Total works completed: {:>16}", c.total_works_completed)?;
                writeln!(f, "Credits:               {:>16}", c.deductions)?;
                writeln!(f, "Payment received:      {:>16}", c.payment_received)?;
                writeln!(f, "Sub-total:             {:>16}", c.sub_total)?;
                writeln!(f, "GST:                   {:>16}", c.gst)?;
                writeln!(f, "Total inc GST:         {:>16}", c.total_inc_gst)?;
            }
        }

        if !self.attachments.is_empty() {
            writeln!(f)?;
            write!(f, "{}", AttachmentTable(self.attachments))?;
        }
        Ok(())
    }
}

fn write_stored_items(
    f: &mut fmt::Formatter<'_>,
    items: &[ClaimItem],
) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(f, "{:<30} {:>14} {:>7} {:>14} {:>14}", "Item", "Contract", "%", "This claim", "Left to claim")?;
    for i in items {
        writeln!(
            f,
            "{:<30} {:>14} {:>7} {:>14} {:>14}",
            i.description, i.contract_value, i.percent_complete, i.this_claim, i.left_to_claim
        )?;
    }
    writeln!(f)
}

fn write_stored_variations(
    f: &mut fmt::Formatter<'_>,
    variations: &[Variation],
) -> fmt::Result {
    if variations.is_empty() {
        return Ok(());
    }
    writeln!(f, "{:<30} {:>10} {:>12} {:>14}  {}", "Variation", "Qty", "Rate", "Value", "Status")?;
    for v in variations {
        writeln!(
            f,
            "{:<30} {:>10} {:>12} {:>14}  {}",
            v.description,
            v.quantity,
            v.rate,
            v.variation_value,
            v.status.as_str()
        )?;
    }
    writeln!(f)
}

fn write_stored_credits(
    f: &mut fmt::Formatter<'_>,
    credits: &[Credit],
) -> fmt::Result {
    if credits.is_empty() {
        return Ok(());
    }
    writeln!(f, "{:<30} {:>14}", "Credit", "Amount")?;
    for c in credits {
        writeln!(f, "{:<30} {:>14}", c.description, c.amount)?;
    }
    writeln!(f)
}

pub struct SimplePreview<'a>(pub &'a SimpleClaimResult);

impl fmt::Display for SimplePreview<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let r = self.0;
        writeln!(f, "Contract work to date: {:>16}", r.contract_work)?;
        writeln!(f, "Previous claims:       {:>16}", r.previous_claim)?;
        writeln!(f, "This claim (ex GST):   {:>16}", r.this_claim)?;
        writeln!(f, "GST:                   {:>16}", r.gst)?;
        writeln!(f, "Total inc GST:         {:>16}", r.total_inc_gst)?;
        writeln!(f, "Retention held:        {:>16}", r.retention_held)?;
        writeln!(f, "Amount due:            {:>16}", r.amount_due)
    }
}

pub struct ItemizedPreview<'a>(pub &'a ItemizedClaimResult);

impl fmt::Display for ItemizedPreview<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let r = self.0;
        writeln!(f, "{:<30} {:>14} {:>7} {:>14} {:>14}", "Item", "Contract", "%", "This claim", "Left to claim")?;
        for i in &r.lines.items {
            writeln!(
                f,
                "{:<30} {:>14} {:>7} {:>14} {:>14}",
                i.description, i.contract_value, i.percent_complete, i.this_claim, i.left_to_claim
            )?;
        }
        for v in &r.lines.variations {
            writeln!(f, "Variation: {:<19} {:>10} x {:>12} = {:>14}", v.description, v.quantity, v.rate, v.variation_value)?;
        }
        for c in &r.lines.credits {
            writeln!(f, "Credit:    {:<19} {:>14}", c.description, c.amount)?;
        }
        writeln!(f)?;
        writeln!(f, "Total works completed: {:>16}", r.total_works_completed())?;
        writeln!(f, "Total variations:      {:>16}", r.total_variations())?;
        writeln!(f, "Total credits:         {:>16}", r.total_credits())?;
        writeln!(f, "Payment received:      {:>16}", r.payment_received)?;
        writeln!(f, "Sub-total:             {:>16}", r.sub_total)?;
        writeln!(f, "GST:                   {:>16}", r.gst)?;
        writeln!(f, "Total inc GST:         {:>16}", r.total_inc_gst)
    }
}

pub struct AttachmentTable<'a>(pub &'a [Attachment]);

impl fmt::Display for AttachmentTable<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No attachments.");
        }
        writeln!(f, "{:>5}  {:<30} {:>10}  {}", "ID", "File", "Bytes", "URL")?;
        for a in self.0 {
            writeln!(f, "{:>5}  {:<30} {:>10}  {}", a.id, a.file_name, a.file_size, a.file_url)?;
        }
        Ok(())
    }
}
