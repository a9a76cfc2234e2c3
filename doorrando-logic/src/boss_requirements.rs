use crate::CollectionState;
use doorrando_game::{Boss, PlayerId};

fn has(state: &CollectionState, item: &str, player: PlayerId) -> bool {
    state.has(item, player, 1)
}

fn can_defeat_armos_knights(state: &CollectionState, player: PlayerId) -> bool {
    state.has_blunt_weapon(player)
        || state.can_shoot_arrows(player)
        || (has(state, "Cane of Somaria", player) && state.can_extend_magic(10, player))
        || (has(state, "Cane of Byrna", player) && state.can_extend_magic(16, player))
        || (has(state, "Ice Rod", player) && state.can_extend_magic(32, player))
        || (has(state, "Fire Rod", player) && state.can_extend_magic(32, player))
        || has(state, "Blue Boomerang", player)
        || has(state, "Red Boomerang", player)
}

fn can_defeat_lanmolas(state: &CollectionState, player: PlayerId) -> bool {
    state.has_blunt_weapon(player)
        || state.can_shoot_arrows(player)
        || has(state, "Fire Rod", player)
        || has(state, "Ice Rod", player)
        || has(state, "Cane of Somaria", player)
        || has(state, "Cane of Byrna", player)
}

fn can_defeat_arrghus(state: &CollectionState, player: PlayerId) -> bool {
    if !has(state, "Hookshot", player) {
        return false;
    }
    if state.has_blunt_weapon(player) {
        return true;
    }
    (has(state, "Fire Rod", player)
        && (state.can_shoot_arrows(player) || state.can_extend_magic(12, player)))
        || (has(state, "Ice Rod", player)
            && (state.can_shoot_arrows(player) || state.can_extend_magic(16, player)))
}

fn can_defeat_mothula(state: &CollectionState, player: PlayerId) -> bool {
    state.has_blunt_weapon(player)
        || (has(state, "Fire Rod", player) && state.can_extend_magic(10, player))
        || (has(state, "Cane of Somaria", player) && state.can_extend_magic(16, player))
        || (has(state, "Cane of Byrna", player) && state.can_extend_magic(16, player))
}

fn can_defeat_kholdstare(state: &CollectionState, player: PlayerId) -> bool {
    state.can_melt_things(player)
        && (has(state, "Hammer", player)
            || state.has_sword(player)
            || (has(state, "Fire Rod", player) && state.can_extend_magic(20, player))
            || (has(state, "Fire Rod", player)
                && has(state, "Bombos", player)
                && state.can_extend_magic(16, player)))
}

fn can_defeat_trinexx(state: &CollectionState, player: PlayerId) -> bool {
    if !(has(state, "Fire Rod", player) && has(state, "Ice Rod", player)) {
        return false;
    }
    has(state, "Hammer", player)
        || has(state, "Golden Sword", player)
        || has(state, "Tempered Sword", player)
        || (has(state, "Master Sword", player) && state.can_extend_magic(16, player))
        || (state.has_sword(player) && state.can_extend_magic(32, player))
}

pub fn can_defeat(boss: Boss, state: &CollectionState, player: PlayerId) -> bool {
    match boss {
        Boss::ArmosKnights => can_defeat_armos_knights(state, player),
        Boss::Lanmolas => can_defeat_lanmolas(state, player),
        Boss::Moldorm => state.has_blunt_weapon(player),
        Boss::HelmasaurKing => state.has_sword(player) || state.can_shoot_arrows(player),
        Boss::Arrghus => can_defeat_arrghus(state, player),
        Boss::Mothula => can_defeat_mothula(state, player),
        Boss::Blind => {
            state.has_blunt_weapon(player)
                || has(state, "Cane of Somaria", player)
                || has(state, "Cane of Byrna", player)
        }
        Boss::Kholdstare => can_defeat_kholdstare(state, player),
        Boss::Vitreous => state.has_blunt_weapon(player) || state.can_shoot_arrows(player),
        Boss::Trinexx => can_defeat_trinexx(state, player),
        Boss::Agahnim | Boss::Agahnim2 => {
            state.has_sword(player)
                || has(state, "Hammer", player)
                || has(state, "Bug Catching Net", player)
        }
    }
}
