//! Predicate-to-filter translation.
//!
//! Walks a predicate expression over the domain type and produces the
//! storage collaborator's native filter string. Per-leaf translation is
//! delegated to the mapper owning the member; translation fails closed
//! on anything no mapper can express.

use crate::error::QueryError;
use crate::mapper::{MapperSet, Translation};
use crate::predicate::Expr;

/// Translate a domain predicate into a storage filter string.
///
/// Boolean connectives are grouped explicitly, so operator precedence in
/// the output matches the shape of the input tree exactly.
///
/// # Errors
/// Returns `QueryError` when any sub-expression cannot be expressed: an
/// unowned member, an operator the owning mapper declines, or a shape
/// other than `member op literal`. No partial filter is ever returned.
pub fn translate_predicate<E>(expr: &Expr, mappers: &MapperSet<E>) -> Result<String, QueryError> {
    match expr {
        Expr::And(left, right) => Ok(format!(
            "({}) and ({})",
            translate_predicate(left, mappers)?,
            translate_predicate(right, mappers)?
        )),
        Expr::Or(left, right) => Ok(format!(
            "({}) or ({})",
            translate_predicate(left, mappers)?,
            translate_predicate(right, mappers)?
        )),
        Expr::Not(inner) => Ok(format!("not ({})", translate_predicate(inner, mappers)?)),
        Expr::Compare(left, op, right) => {
            let (member, literal) = match (&**left, &**right) {
                (Expr::Member(member), Expr::Literal(literal)) => (member, literal),
                (Expr::Member(_), Expr::Member(_)) => {
                    return Err(QueryError::MemberToMemberComparison);
                }
                _ => {
                    return Err(QueryError::UnsupportedShape(
                        "comparison must be between a member and a literal".to_owned(),
                    ));
                }
            };
            let owner = mappers
                .owner_of(member)
                .ok_or_else(|| QueryError::UnknownMember(member.clone()))?;
            match owner.translate(*op, literal) {
                Translation::Fragment(fragment) => Ok(fragment),
                Translation::Unsupported => Err(QueryError::Untranslatable {
                    member: member.clone(),
                    op: *op,
                }),
            }
        }
        Expr::Member(member) => Err(QueryError::BareMember(member.clone())),
        Expr::Literal(_) => Err(QueryError::BareLiteral),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{ContentMapper, DirectMapper, KeyMapper, MapperSet};
    use crate::predicate::member;

    #[derive(Clone, Debug, Default)]
    struct Ticket {
        tenant: String,
        id: String,
        status: String,
        priority: i64,
        notes: Option<Vec<String>>,
    }

    fn ticket_mappers() -> MapperSet<Ticket> {
        MapperSet::builder()
            .with_keys(KeyMapper::new(
                |t: &Ticket| t.tenant.clone(),
                |t: &Ticket| t.id.clone(),
            ))
            .with(DirectMapper::new(
                "status",
                "status",
                |t: &Ticket| t.status.clone(),
                |t, v| t.status = v,
            ))
            .with(DirectMapper::new(
                "priority",
                "priority",
                |t: &Ticket| t.priority,
                |t, v| t.priority = v,
            ))
            .with(ContentMapper::json(
                "notes",
                |t: &Ticket| t.notes.clone(),
                |t, v| t.notes = Some(v),
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn single_comparison_renders_bare() {
        let mappers = ticket_mappers();
        let filter = translate_predicate(&member("status").eq("active"), &mappers).unwrap();
        assert_eq!(filter, "status eq 'active'");
    }

    #[test]
    fn connectives_group_explicitly() {
        let mappers = ticket_mappers();
        let expr = member("status")
            .eq("active")
            .and(member("priority").ge(3).or(member("priority").lt(1)));
        let filter = translate_predicate(&expr, &mappers).unwrap();
        assert_eq!(
            filter,
            "(status eq 'active') and ((priority ge 3) or (priority lt 1))"
        );
    }

    #[test]
    fn negation_wraps_the_inner_expression() {
        let mappers = ticket_mappers();
        let filter = translate_predicate(&!member("status").eq("done"), &mappers).unwrap();
        assert_eq!(filter, "not (status eq 'done')");
    }

    #[test]
    fn string_literals_escape_quotes() {
        let mappers = ticket_mappers();
        let filter = translate_predicate(&member("status").eq("o'brien"), &mappers).unwrap();
        assert_eq!(filter, "status eq 'o''brien'");
    }

    #[test]
    fn unknown_member_fails_closed() {
        let mappers = ticket_mappers();
        let err = translate_predicate(&member("nope").eq(1i64), &mappers).unwrap_err();
        assert!(matches!(err, QueryError::UnknownMember(m) if m == "nope"));
    }

    #[test]
    fn member_without_translation_capability_fails_closed() {
        let mappers = ticket_mappers();
        // the content mapper owns `notes` but declines every operator
        let err = translate_predicate(&member("notes").eq("x"), &mappers).unwrap_err();
        assert!(matches!(err, QueryError::Untranslatable { member, .. } if member == "notes"));
    }

    #[test]
    fn kind_mismatch_declines() {
        let mappers = ticket_mappers();
        let err = translate_predicate(&member("priority").eq("high"), &mappers).unwrap_err();
        assert!(matches!(err, QueryError::Untranslatable { member, .. } if member == "priority"));
    }

    #[test]
    fn one_bad_branch_poisons_the_whole_predicate() {
        let mappers = ticket_mappers();
        let expr = member("status").eq("active").and(member("nope").eq(1i64));
        assert!(translate_predicate(&expr, &mappers).is_err());
    }

    #[test]
    fn bare_member_and_literal_are_rejected() {
        let mappers = ticket_mappers();
        assert!(matches!(
            translate_predicate(&Expr::Member("status".to_owned()), &mappers),
            Err(QueryError::BareMember(_))
        ));
        assert!(matches!(
            translate_predicate(&Expr::Literal(1i64.into()), &mappers),
            Err(QueryError::BareLiteral)
        ));
    }
}
