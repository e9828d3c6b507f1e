//! Term membership.
//!
//! Terms inherit from their ancestors. Looking down the tree, a term is
//! also reported through its assigned descendants.

use std::collections::BTreeMap;

use uam_common::{ObjectId, ObjectRef, ObjectType};

use super::{MembershipHandler, ObjectMembership, ResolveContext};
use crate::groups::AccessGroup;
use crate::objects::MembershipFamily;

#[derive(Debug, Clone, Copy, Default)]
pub struct TermMembershipHandler;

/// Terms of every taxonomy the group covers, including descendants of
/// assigned terms when recursive.
pub(crate) fn full_terms(
    ctx: &ResolveContext<'_>,
    group: &dyn AccessGroup,
    lock_recursive: bool,
) -> BTreeMap<ObjectId, ObjectType> {
    let tree = ctx.relations.term_tree();
    let mut terms = BTreeMap::new();

    for taxonomy in ctx.types.taxonomies() {
        for id in group.assigned_objects(ctx, taxonomy).into_keys() {
            if lock_recursive {
                for descendant in tree.descendants(&id) {
                    terms
                        .entry(descendant.id.clone())
                        .or_insert_with(|| descendant.object_type.clone());
                }
            }
            terms.insert(id, taxonomy.clone());
        }
    }

    terms
}

impl MembershipHandler for TermMembershipHandler {
    fn family(&self) -> MembershipFamily {
        MembershipFamily::Term
    }

    fn object_membership(
        &self,
        ctx: &ResolveContext<'_>,
        group: &dyn AccessGroup,
        lock_recursive: bool,
        object_type: &ObjectType,
        object_id: &ObjectId,
    ) -> ObjectMembership {
        let object = ObjectRef::new(object_type.clone(), object_id.clone());
        let mut membership = ObjectMembership::direct(group.assignment_for(ctx, &object));

        if lock_recursive {
            let tree = ctx.relations.term_tree();
            membership.inherit_from(ctx, group, tree.ancestors(object_id));
        }

        membership
    }

    fn full_object_membership(
        &self,
        ctx: &ResolveContext<'_>,
        group: &dyn AccessGroup,
        lock_recursive: bool,
        object_type: &ObjectType,
        object_id: &ObjectId,
    ) -> ObjectMembership {
        let mut membership =
            self.object_membership(ctx, group, lock_recursive, object_type, object_id);

        if lock_recursive {
            let tree = ctx.relations.term_tree();
            membership.inherit_from(ctx, group, tree.descendants(object_id));
        }

        membership
    }

    fn full_objects(
        &self,
        ctx: &ResolveContext<'_>,
        group: &dyn AccessGroup,
        lock_recursive: bool,
    ) -> BTreeMap<ObjectId, ObjectType> {
        full_terms(ctx, group, lock_recursive)
    }
}
