// Permission hierarchy - the single comparator every punitive action is
// gated on. Kept as a pure function so it can be tested exhaustively.

use super::moderation_models::MemberRank;

/// Can `issuer` act on `target` in a guild owned by `owner_id`?
///
/// The guild owner can act on anyone; nobody can act on the owner; everyone
/// else is compared by highest role position, strictly greater wins.
pub fn can_act_on(owner_id: u64, issuer: &MemberRank, target: &MemberRank) -> bool {
    if issuer.member_id == owner_id {
        return true;
    }
    if target.member_id == owner_id {
        return false;
    }
    issuer.top_role_position > target.top_role_position
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rank(member_id: u64, pos: i64) -> MemberRank {
        MemberRank {
            member_id,
            top_role_position: pos,
        }
    }

    #[test]
    fn owner_acts_on_anyone() {
        let owner = rank(1, 0);
        let admin = rank(2, 50);
        assert!(can_act_on(1, &owner, &admin));
        assert!(!can_act_on(1, &admin, &owner));
    }

    #[test]
    fn higher_role_wins() {
        let a = rank(2, 10);
        let b = rank(3, 5);
        assert!(can_act_on(1, &a, &b));
        assert!(!can_act_on(1, &b, &a));
    }

    #[test]
    fn equal_positions_refuse_both_ways() {
        let a = rank(2, 10);
        let b = rank(3, 10);
        assert!(!can_act_on(1, &a, &b));
        assert!(!can_act_on(1, &b, &a));
    }

    #[test]
    fn antisymmetric_for_non_owners_with_distinct_positions() {
        for (pa, pb) in [(0, 1), (3, 7), (9, 2)] {
            let a = rank(2, pa);
            let b = rank(3, pb);
            assert_ne!(can_act_on(1, &a, &b), can_act_on(1, &b, &a));
        }
    }
}
